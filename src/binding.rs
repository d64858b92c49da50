//! Populates struct fields from string parameters.
//!
//! Fields opt in with a `param` tag, `param = "name"` or
//! `param = "name,required"`; an empty name means the field's own name. A
//! `default` tag supplies a JSON value used when the source has nothing for
//! the field. String fields may write their default bare
//! (`default = "anonymous"`), and composite fields may use single quotes
//! (`default = "['a','b']"`).

use std::any::type_name;
use std::collections::HashMap;

use log::{debug, trace};
use thiserror::Error;

use crate::access;
use crate::error::{CoerceError, TagExprError};
use crate::reflect::{JsonValue, Kind, Reflect, StructDesc};
use crate::registry::{TypeCache, flatten};

/// Where parameter values come from.
pub trait ParamSource {
    /// All values supplied under `name`, or `None` if it is absent.
    fn values(&self, name: &str) -> Option<Vec<&str>>;
}

impl ParamSource for HashMap<String, Vec<String>> {
    fn values(&self, name: &str) -> Option<Vec<&str>> {
        self.get(name)
            .map(|values| values.iter().map(String::as_str).collect())
    }
}

impl ParamSource for HashMap<String, String> {
    fn values(&self, name: &str) -> Option<Vec<&str>> {
        self.get(name).map(|value| vec![value.as_str()])
    }
}

#[derive(Error, Debug)]
pub enum BindError {
    #[error("missing required parameter '{0}'")]
    Required(String),

    #[error("parameter for field '{field}': {source}")]
    TypeMismatch {
        field: String,
        #[source]
        source: CoerceError,
    },

    #[error("default value of field '{field}' does not fit: {source}")]
    InvalidDefault {
        field: String,
        #[source]
        source: CoerceError,
    },

    #[error("default value of field '{field}' is not valid JSON: {source}")]
    DefaultSyntax {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("field '{0}' cannot be reached")]
    Unreachable(String),

    #[error(transparent)]
    Registration(#[from] TagExprError),
}

#[derive(Debug, Clone)]
pub struct BinderConfig {
    pub param_tag: String,
    pub default_tag: String,
    /// Accept an empty string as the zero value of numbers and booleans
    pub loose_zero_mode: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        BinderConfig {
            param_tag: "param".to_string(),
            default_tag: "default".to_string(),
            loose_zero_mode: false,
        }
    }
}

/// A bindable field, read from the tags once per type.
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub field_path: String,
    pub param_name: String,
    pub required: bool,
    pub default: Option<JsonValue>,
}

pub struct Binder {
    config: BinderConfig,
    cache: TypeCache<Vec<ParamInfo>>,
}

impl Binder {
    pub fn new(config: BinderConfig) -> Self {
        Binder {
            config,
            cache: TypeCache::new(),
        }
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    pub fn bind<T: Reflect>(&self, target: &mut T, source: &impl ParamSource) -> Result<(), BindError> {
        let desc = T::struct_desc().ok_or_else(|| TagExprError::NotAStruct(type_name::<T>().to_string()))?;
        let params = self
            .cache
            .get_or_try_insert_with(desc.type_id, || self.collect_params(&desc))?;

        // Missing required parameters fail before any field is written.
        let supplied = |info: &ParamInfo| {
            source
                .values(&info.param_name)
                .is_some_and(|values| !values.is_empty())
        };
        if let Some(missing) = params
            .iter()
            .find(|info| info.required && info.default.is_none() && !supplied(info))
        {
            return Err(BindError::Required(missing.param_name.clone()));
        }

        for info in params.iter() {
            match source.values(&info.param_name) {
                Some(values) if !values.is_empty() => {
                    trace!("binding {} from {:?}", info.field_path, values);
                    field_mut(&mut *target, &info.field_path)?
                        .assign_strs(&values, self.config.loose_zero_mode)
                        .map_err(|source| BindError::TypeMismatch {
                            field: info.field_path.clone(),
                            source,
                        })?;
                }
                _ => {
                    if let Some(default) = &info.default {
                        field_mut(&mut *target, &info.field_path)?
                            .assign_json(default)
                            .map_err(|source| BindError::InvalidDefault {
                                field: info.field_path.clone(),
                                source,
                            })?;
                    }
                }
            }
        }
        Ok(())
    }

    fn collect_params(&self, desc: &StructDesc) -> Result<Vec<ParamInfo>, BindError> {
        let mut params = Vec::new();
        for field in flatten(desc) {
            let param = field.tag(&self.config.param_tag);
            let default = field.tag(&self.config.default_tag);
            if param.is_none() && default.is_none() {
                continue;
            }

            let (name, required) = parse_param_tag(param.unwrap_or_default());
            let default = default
                .map(|text| {
                    serde_json::from_str(&default_to_json(text, field.kind)).map_err(|source| {
                        BindError::DefaultSyntax {
                            field: field.path.clone(),
                            source,
                        }
                    })
                })
                .transpose()?;

            params.push(ParamInfo {
                param_name: if name.is_empty() { field.name().to_string() } else { name.to_string() },
                field_path: field.path,
                required,
                default,
            });
        }
        debug!("{}: {} bindable fields", desc.type_name, params.len());
        Ok(params)
    }
}

impl Default for Binder {
    fn default() -> Self {
        Binder::new(BinderConfig::default())
    }
}

/// Reaches a field that is about to be written, allocating nil pointers on
/// the way.
fn field_mut<'t>(target: &'t mut dyn Reflect, path: &str) -> Result<&'t mut dyn Reflect, BindError> {
    access::resolve_mut(target, path, true).ok_or_else(|| BindError::Unreachable(path.to_string()))
}

/// Splits `name[,required]`.
fn parse_param_tag(tag: &str) -> (&str, bool) {
    let mut parts = tag.split(',').map(str::trim);
    let name = parts.next().unwrap_or_default();
    let required = parts.any(|option| option == "required");
    (name, required)
}

/// Rewrites default tag text into JSON for the field's kind.
fn default_to_json(text: &str, kind: Kind) -> String {
    match kind {
        Kind::String => JsonValue::String(text.to_string()).to_string(),
        Kind::Seq | Kind::Map | Kind::Struct | Kind::Dynamic => swap_quotes(text),
        Kind::Bool | Kind::Int | Kind::Uint | Kind::Float => text.trim().to_string(),
    }
}

/// `'` becomes `"`, while `\'` stays a literal single quote.
fn swap_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'\'') => {
                out.push('\'');
                chars.next();
            }
            '\'' => out.push('"'),
            other => out.push(other),
        }
    }
    out
}

#[test]
fn test_parse_param_tag() {
    assert_eq!(parse_param_tag("id,required"), ("id", true));
    assert_eq!(parse_param_tag("id"), ("id", false));
    assert_eq!(parse_param_tag(""), ("", false));
}

#[test]
fn test_default_to_json() {
    assert_eq!(default_to_json("hi \"x\"", Kind::String), r#""hi \"x\"""#);
    assert_eq!(default_to_json(r"['a','it\'s']", Kind::Seq), r#"["a","it's"]"#);
    assert_eq!(default_to_json(" 42 ", Kind::Int), "42");
}
