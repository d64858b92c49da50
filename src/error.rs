use thiserror::Error;

use crate::ast::ExprSelector;

/// Errors raised while parsing tag text into an expression tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{found}' at offset {offset} in `{expr}`")]
    UnexpectedChar {
        expr: String,
        offset: usize,
        found: char,
    },

    #[error("unexpected end of expression `{0}`")]
    UnexpectedEnd(String),

    #[error("unterminated string literal in `{0}`")]
    UnterminatedString(String),

    #[error("unbalanced '{open}' in `{expr}`")]
    Unbalanced { open: char, expr: String },

    #[error("empty expression")]
    Empty,

    #[error("mixed selector prefix in `{0}`")]
    MixedPrefix(String),

    #[error("empty or nested sub-selector in `{0}`")]
    InvalidSubSelector(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("regexp() pattern must be a string literal")]
    PatternNotLiteral,

    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
}

/// Errors raised while registering a struct type or an expression set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TagExprError {
    #[error("{type_name}: cannot parse expression `{selector}`: {source}")]
    Parse {
        type_name: String,
        selector: ExprSelector,
        #[source]
        source: ParseError,
    },

    #[error("{type_name}: duplicate expression `{selector}`")]
    DuplicateName {
        type_name: String,
        selector: ExprSelector,
    },

    #[error("{0} is not a tagged struct")]
    NotAStruct(String),
}

/// Errors raised when writing a string or JSON value into a field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoerceError {
    #[error("cannot parse {text:?} as {expected}")]
    Parse { expected: &'static str, text: String },

    #[error("expected {expected}, found {found}")]
    Mismatch { expected: &'static str, found: String },

    #[error("value {value} is out of range for {expected}")]
    OutOfRange { expected: &'static str, value: String },

    #[error("no value supplied")]
    Empty,

    #[error("field does not accept assignment")]
    Unsupported,
}

impl CoerceError {
    pub(crate) fn mismatch(expected: &'static str, found: &serde_json::Value) -> Self {
        CoerceError::Mismatch {
            expected,
            found: found.to_string(),
        }
    }
}
