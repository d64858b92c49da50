use std::borrow::Cow;
use std::fmt;

use crate::reflect::{Reflect, View};

/// A dynamically typed evaluation result.
///
/// Every expression evaluates to one of a small closed set of kinds. Numbers
/// read from struct fields are widened to `Float`, strings borrowed from the
/// instance stay borrowed, and composite fields (structs, sequences, maps) are
/// passed through untouched as `Opaque` so that built-in functions such as
/// `len()` can still inspect them.
///
/// # Examples
///
/// ```
/// use tagexpr::Value;
///
/// let null = Value::Null;
/// let boolean = Value::Boolean(true);
/// let float = Value::Float(3.5);
/// let string = Value::from("hello");
///
/// assert!(!null.as_bool());
/// assert!(boolean.as_bool());
/// assert_eq!(float.as_float(), Some(3.5));
/// assert_eq!(string.as_str(), Some("hello"));
/// ```
#[derive(Debug, Clone)]
pub enum Value<'a> {
    /// Absent value (unresolved selector, type mismatch, nil literal)
    Null,

    /// Boolean (true/false)
    Boolean(bool),

    /// Every numeric kind, widened to 64-bit float
    Float(f64),

    /// UTF-8 string, borrowed from the instance when read from a field
    String(Cow<'a, str>),

    /// A composite field handed back without conversion
    Opaque(&'a dyn Reflect),
}

impl<'a> Value<'a> {
    /// Converts a field into a value, following pointers.
    pub fn from_reflect(field: &'a dyn Reflect) -> Self {
        match field.view() {
            View::Nil | View::Pointer(None) => Value::Null,
            View::Bool(b) => Value::Boolean(b),
            View::Int(n) => Value::Float(n as f64),
            View::Uint(n) => Value::Float(n as f64),
            View::Float(n) => Value::Float(n),
            View::Str(s) => Value::String(Cow::Borrowed(s)),
            View::Pointer(Some(inner)) => Value::from_reflect(inner),
            View::Struct(_) | View::Seq(_) | View::Map(_) => Value::Opaque(field),
        }
    }

    /// Truthiness used by logical operators and validation.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Opaque(field) => match field.view() {
                View::Seq(seq) => seq.len() > 0,
                View::Map(map) => map.len() > 0,
                View::Pointer(None) | View::Nil => false,
                _ => true,
            },
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Boolean(_) => "boolean",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Opaque(_) => "opaque",
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => {
                std::ptr::addr_eq(*a as *const dyn Reflect, *b as *const dyn Reflect)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "<nil>"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Opaque(field) => write!(f, "{:?}", field),
        }
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value<'_> {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::String(Cow::Borrowed(s))
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::String(Cow::Owned(s))
    }
}
