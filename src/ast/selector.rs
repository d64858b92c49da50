use std::fmt;

use crate::ast::Expr;

/// Separates a field path from an expression name in an [`ExprSelector`].
pub const EXPR_NAME_SEPARATOR: char = '@';

/// Name of the expression written without a `name:` prefix.
pub const DEFAULT_EXPR_NAME: &str = "";

/// A `$` reference inside an expression.
///
/// `(a.b)$` reads field `a.b`; a bare `$` reads the field whose tag holds the
/// expression. Each `[...]` suffix is evaluated and used to index into the
/// resolved value.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub field: String,
    pub sub_selectors: Vec<Expr>,
    /// Set by a `!` prefix run; `Some(true)` for an odd count.
    pub bool_negation: Option<bool>,
    /// Set by a `-` prefix run; `Some(true)` for an odd count.
    pub float_negation: Option<bool>,
}

impl Selector {
    pub fn current() -> Self {
        Selector {
            field: String::new(),
            sub_selectors: Vec::new(),
            bool_negation: None,
            float_negation: None,
        }
    }

    pub fn is_current(&self) -> bool {
        self.field.is_empty()
    }
}

/// Identifies one expression of a struct: the flattened field path plus the
/// expression name, written `field@name` (or just `field` for the default).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprSelector {
    field: String,
    name: String,
}

impl ExprSelector {
    pub fn new(field: impl Into<String>, name: impl Into<String>) -> Self {
        ExprSelector {
            field: field.into(),
            name: name.into(),
        }
    }

    /// Splits `field@name` on the last separator.
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once(EXPR_NAME_SEPARATOR) {
            Some((field, name)) => ExprSelector::new(field, name),
            None => ExprSelector::new(text, DEFAULT_EXPR_NAME),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_EXPR_NAME
    }

    /// Same field, different expression name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        ExprSelector::new(self.field.clone(), name)
    }
}

impl fmt::Display for ExprSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            write!(f, "{}", self.field)
        } else {
            write!(f, "{}{}{}", self.field, EXPR_NAME_SEPARATOR, self.name)
        }
    }
}

impl From<&str> for ExprSelector {
    fn from(text: &str) -> Self {
        ExprSelector::parse(text)
    }
}
