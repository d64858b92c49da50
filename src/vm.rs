use std::any::type_name;
use std::sync::Arc;

use log::debug;

use crate::access;
use crate::ast::ExprSelector;
use crate::error::TagExprError;
use crate::evaluator::Evaluator;
use crate::reflect::{Reflect, View};
use crate::registry::{StructMeta, TypeCache};
use crate::value::Value;

/// Compiles and caches the expressions found under one tag name.
///
/// Each struct type is registered the first time it is seen and the result is
/// kept for the life of the `Vm`. Separate `Vm`s (say one for `vd` and one for
/// `param`) keep separate caches.
///
/// ```
/// use tagexpr::Vm;
///
/// tagexpr::tagged! {
///     #[derive(Debug, Default)]
///     struct Bounds {
///         #[tag(te = "$<0||$>=100")]
///         a: i64,
///     }
/// }
///
/// let vm = Vm::new("te");
/// let out = Bounds { a: 150 };
/// assert!(vm.run(&out).unwrap().eval_bool("a"));
/// ```
pub struct Vm {
    tag_name: String,
    cache: TypeCache<StructMeta>,
}

impl Vm {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Vm {
            tag_name: tag_name.into(),
            cache: TypeCache::new(),
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// Registers `T` ahead of first use.
    pub fn register<T: Reflect>(&self) -> Result<Arc<StructMeta>, TagExprError> {
        let desc = T::struct_desc().ok_or_else(|| TagExprError::NotAStruct(type_name::<T>().to_string()))?;
        self.cache
            .get_or_try_insert_with(desc.type_id, || StructMeta::from_desc(&desc, &self.tag_name))
    }

    /// Metadata for the struct behind `value`, registering its type if needed.
    pub fn meta_of(&self, value: &dyn Reflect) -> Result<Arc<StructMeta>, TagExprError> {
        let target = access::deref(value).ok_or_else(|| TagExprError::NotAStruct("nil".to_string()))?;
        let View::Struct(s) = target.view() else {
            return Err(TagExprError::NotAStruct(describe(target)));
        };
        self.cache.get_or_try_insert_with(s.struct_type(), || {
            debug!("first use of {} under tag `{}`", s.descriptor().type_name, self.tag_name);
            StructMeta::from_desc(&s.descriptor(), &self.tag_name)
        })
    }

    /// Binds an instance to its type's expressions.
    pub fn run<'a, T: Reflect>(&self, value: &'a T) -> Result<TagExpr<'a>, TagExprError> {
        self.run_dyn(value)
    }

    pub fn run_dyn<'a>(&self, value: &'a dyn Reflect) -> Result<TagExpr<'a>, TagExprError> {
        let meta = self.meta_of(value)?;
        let root = access::deref(value).unwrap_or(value);
        Ok(TagExpr::new(meta, root))
    }

    /// Number of registered types.
    pub fn registered(&self) -> usize {
        self.cache.len()
    }
}

fn describe(value: &dyn Reflect) -> String {
    let kind = match value.view() {
        View::Nil | View::Pointer(None) => "nil",
        View::Bool(_) => "bool",
        View::Int(_) | View::Uint(_) => "integer",
        View::Float(_) => "float",
        View::Str(_) => "string",
        View::Seq(_) => "sequence",
        View::Map(_) => "map",
        View::Struct(_) | View::Pointer(Some(_)) => "value",
    };
    kind.to_string()
}

/// One instance paired with its type's compiled expressions.
pub struct TagExpr<'a> {
    meta: Arc<StructMeta>,
    evaluator: Evaluator<'a>,
}

impl<'a> TagExpr<'a> {
    pub fn new(meta: Arc<StructMeta>, root: &'a dyn Reflect) -> Self {
        TagExpr {
            meta,
            evaluator: Evaluator::new(root),
        }
    }

    pub fn meta(&self) -> &StructMeta {
        &self.meta
    }

    /// Evaluates the expression addressed as `field` or `field@name`.
    pub fn eval(&self, selector: &str) -> Value<'a> {
        self.eval_selector(&ExprSelector::parse(selector))
    }

    /// Unknown selectors evaluate to `Null`. Relative selectors inside the
    /// expression read the addressed field, whatever the expression name.
    pub fn eval_selector(&self, selector: &ExprSelector) -> Value<'a> {
        match self.meta.expr(selector) {
            Some(expr) => self.evaluator.eval_expr(expr, selector.field()),
            None => Value::Null,
        }
    }

    pub fn eval_bool(&self, selector: &str) -> bool {
        self.eval(selector).as_bool()
    }

    /// The result if it is a string, otherwise empty.
    pub fn eval_string(&self, selector: &str) -> String {
        match self.eval(selector) {
            Value::String(s) => s.into_owned(),
            _ => String::new(),
        }
    }

    /// The current value of a field, read without any expression.
    pub fn field(&self, path: &str) -> Value<'a> {
        self.evaluator.field(path)
    }

    pub fn selectors(&self) -> impl Iterator<Item = &ExprSelector> {
        self.meta.selectors()
    }

    /// Evaluates every expression in declaration order until `f` returns
    /// `false`.
    pub fn range(&self, mut f: impl FnMut(&ExprSelector, Value<'a>) -> bool) {
        for (selector, expr) in self.meta.exprs() {
            if !f(selector, self.evaluator.eval_expr(expr, selector.field())) {
                break;
            }
        }
    }
}
