use std::fmt;

use regex::Regex;

/// Built-in functions callable from expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// `len(x)`: byte length of a string, element count of a sequence or map
    Len,
    /// `mblen(x)`: character count of a string, element count otherwise
    MbLen,
    /// `regexp('pattern'[, x])`, compiled when the tag is parsed
    Regexp(Pattern),
    /// `in(x, a, b, ...)`
    In,
    /// `sprintf('format', args...)`
    Sprintf,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::Len => "len",
            Function::MbLen => "mblen",
            Function::Regexp(_) => "regexp",
            Function::In => "in",
            Function::Sprintf => "sprintf",
        }
    }
}

/// A compiled `regexp()` pattern.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(regex: Regex) -> Self {
        Pattern(regex)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.as_str())
    }
}
