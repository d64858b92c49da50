//! CLI support for tagexpr
//!
//! Compiles ad-hoc `path=tag` expressions and runs them against JSON
//! documents, so tags can be tried out before they are put on a struct.

mod check;
mod validate;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use validate::{ValidateOptions, ValidateOutcome, execute_validate};

use std::io;

use crate::registry::StructMeta;

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// An expression failed to compile
    Registration(crate::TagExprError),
    /// Validation failed with a custom error
    Validation(crate::ValidateError),
    /// An `-e` argument without `=`
    InvalidExprArg(String),
    /// JSON parsing error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
    /// No input provided
    NoInput,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Registration(e) => write!(f, "Parse error: {}", e),
            CliError::Validation(e) => write!(f, "Validation error: {}", e),
            CliError::InvalidExprArg(arg) => {
                write!(f, "Invalid expression argument '{}': expected 'path=tag'", arg)
            }
            CliError::Json(e) => write!(f, "Invalid JSON: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(f, "No input provided. Use --input or pipe JSON to stdin."),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Registration(e) => Some(e),
            CliError::Validation(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<crate::TagExprError> for CliError {
    fn from(e: crate::TagExprError) -> Self {
        CliError::Registration(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

/// Compiles `path=tag` arguments into one expression set.
fn compile(exprs: &[String]) -> Result<StructMeta, CliError> {
    let pairs = exprs
        .iter()
        .map(|arg| {
            arg.split_once('=')
                .map(|(path, tag)| (path.trim(), tag))
                .ok_or_else(|| CliError::InvalidExprArg(arg.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StructMeta::from_tags("input", pairs)?)
}

fn parse_input(input: Option<&String>) -> Result<serde_json::Value, CliError> {
    let json_str = input.ok_or(CliError::NoInput)?;
    Ok(serde_json::from_str(json_str)?)
}
