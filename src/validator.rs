//! Struct validation driven by tag expressions.
//!
//! Every field's default expression must be truthy. The first one that is
//! not stops the walk and is reported together with the field's `msg`
//! expression, if it has one.
//!
//! ```
//! use tagexpr::Validator;
//!
//! tagexpr::tagged! {
//!     #[derive(Debug, Default)]
//!     struct Signup {
//!         #[tag(vd = "len($)>0;msg:'name is required'")]
//!         name: String,
//!         #[tag(vd = "$>=18")]
//!         age: u8,
//!     }
//! }
//!
//! let validator = Validator::new("vd");
//! let err = validator
//!     .validate(&Signup { name: String::new(), age: 30 })
//!     .unwrap_err();
//! assert_eq!(err.to_string(), "name is required");
//! ```

use std::borrow::Cow;
use std::sync::Arc;

use thiserror::Error;

use crate::access;
use crate::error::TagExprError;
use crate::evaluator::Evaluator;
use crate::reflect::{Kind, Reflect, View};
use crate::registry::StructMeta;
use crate::value::Value;
use crate::vm::Vm;

/// Expression name holding the failure message.
pub const ERR_MSG_EXPR_NAME: &str = "msg";

/// A field whose expression evaluated falsy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", self.text())]
pub struct ValidationError {
    /// Path of the failing field, with `index/` or `key/` segments for
    /// elements of sequences and maps
    pub fail_path: String,
    pub msg: String,
}

impl ValidationError {
    /// The message, or `invalid parameter: <path>` when there is none.
    fn text(&self) -> Cow<'_, str> {
        if self.msg.is_empty() {
            Cow::Owned(format!("invalid parameter: {}", self.fail_path))
        } else {
            Cow::Borrowed(&self.msg)
        }
    }
}

/// Error returned by a custom error factory.
pub type CustomError = Arc<dyn std::error::Error + Send + Sync>;

type ErrorFactory = Box<dyn Fn(&str, &str) -> CustomError + Send + Sync>;

#[derive(Error, Debug, Clone)]
pub enum ValidateError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Built by the factory installed with [`Validator::with_error_factory`]
    #[error(transparent)]
    Custom(CustomError),

    #[error(transparent)]
    Registration(#[from] TagExprError),
}

impl PartialEq for ValidateError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValidateError::Invalid(a), ValidateError::Invalid(b)) => a == b,
            (ValidateError::Custom(a), ValidateError::Custom(b)) => Arc::ptr_eq(a, b),
            (ValidateError::Registration(a), ValidateError::Registration(b)) => a == b,
            _ => false,
        }
    }
}

/// Walks values and checks every tagged struct it reaches.
pub struct Validator {
    vm: Vm,
    msg_name: String,
    error_factory: Option<ErrorFactory>,
}

impl Validator {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Validator {
            vm: Vm::new(tag_name),
            msg_name: ERR_MSG_EXPR_NAME.to_string(),
            error_factory: None,
        }
    }

    /// Reads failure messages from `name` instead of `msg`.
    pub fn with_msg_name(mut self, name: impl Into<String>) -> Self {
        self.msg_name = name.into();
        self
    }

    /// Builds failures with `factory(fail_path, msg)`. They are returned as
    /// [`ValidateError::Custom`].
    ///
    /// ```
    /// use tagexpr::{ValidateError, Validator};
    ///
    /// tagexpr::tagged! {
    ///     #[derive(Debug, Default)]
    ///     struct Form {
    ///         #[tag(vd = "$>0")]
    ///         count: u32,
    ///     }
    /// }
    ///
    /// let validator = Validator::new("vd")
    ///     .with_error_factory(|path, _msg| std::io::Error::other(format!("bad {}", path)));
    /// let err = validator.validate(&Form::default()).unwrap_err();
    /// assert!(matches!(err, ValidateError::Custom(_)));
    /// assert_eq!(err.to_string(), "bad count");
    /// ```
    pub fn with_error_factory<E, F>(mut self, factory: F) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        F: Fn(&str, &str) -> E + Send + Sync + 'static,
    {
        self.error_factory = Some(Box::new(move |path: &str, msg: &str| {
            Arc::new(factory(path, msg)) as CustomError
        }));
        self
    }

    /// Drops a custom factory; failures are [`ValidationError`]s again.
    pub fn with_default_errors(mut self) -> Self {
        self.error_factory = None;
        self
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    pub fn validate<T: Reflect>(&self, value: &T) -> Result<(), ValidateError> {
        self.validate_dyn(value)
    }

    pub fn validate_dyn(&self, value: &dyn Reflect) -> Result<(), ValidateError> {
        self.walk(value, "")
    }

    /// Checks `value` against an expression set compiled separately, such as
    /// one built with [`StructMeta::from_tags`].
    pub fn validate_with(&self, meta: &StructMeta, value: &dyn Reflect) -> Result<(), ValidateError> {
        let root = access::deref(value).unwrap_or(value);
        self.check_struct(meta, root, "")
    }

    fn walk(&self, value: &dyn Reflect, prefix: &str) -> Result<(), ValidateError> {
        let Some(value) = access::deref(value) else {
            return Ok(());
        };

        match value.view() {
            View::Struct(_) => {
                let meta = self.vm.meta_of(value)?;
                self.check_struct(&meta, value, prefix)
            }
            View::Seq(seq) => {
                for i in 0..seq.len() {
                    if let Some(item) = seq.get(i).filter(|item| is_composite(*item)) {
                        self.walk(item, &format!("{}{}/", prefix, i))?;
                    }
                }
                Ok(())
            }
            View::Map(map) => {
                for entry in map.entries() {
                    if is_composite(entry.key) {
                        self.walk(entry.key, &format!("{}{{k}}/", prefix))?;
                    }
                    if is_composite(entry.value) {
                        self.walk(entry.value, &format!("{}{}/", prefix, entry.text))?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn check_struct(&self, meta: &StructMeta, value: &dyn Reflect, prefix: &str) -> Result<(), ValidateError> {
        let evaluator = Evaluator::new(value);

        for (selector, expr) in meta.default_exprs() {
            if evaluator.eval_expr(expr, selector.field()).as_bool() {
                continue;
            }
            let msg = meta
                .expr(&selector.with_name(self.msg_name.as_str()))
                .map(|msg_expr| evaluator.eval_expr(msg_expr, selector.field()))
                .and_then(|msg| match msg {
                    Value::String(s) => Some(s.into_owned()),
                    _ => None,
                })
                .unwrap_or_default();
            return Err(self.failure(format!("{}{}", prefix, selector.field()), msg));
        }

        // Directly nested structs were flattened into `meta` already.
        let descend = meta
            .fields()
            .iter()
            .filter(|field| field.kind.is_composite() && (field.kind != Kind::Struct || field.recursive));
        for field in descend {
            if let Some(child) = access::resolve(value, &field.path) {
                self.walk(child, &format!("{}{}/", prefix, field.path))?;
            }
        }
        Ok(())
    }

    fn failure(&self, fail_path: String, msg: String) -> ValidateError {
        match &self.error_factory {
            Some(factory) => ValidateError::Custom(factory(&fail_path, &msg)),
            None => ValidationError { fail_path, msg }.into(),
        }
    }
}

fn is_composite(value: &dyn Reflect) -> bool {
    access::deref(value).is_some_and(|v| v.view().is_composite())
}
