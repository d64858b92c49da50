//! Evaluate tag expressions against JSON input

use std::sync::Arc;

use serde_json::Map;

use super::{CliError, compile, parse_input};
use crate::output::to_json;
use crate::vm::TagExpr;

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// `path=tag` pairs
    pub exprs: Vec<String>,
    /// JSON input string
    pub input: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Every expression parsed
    SyntaxValid,
    /// Each selector mapped to its result
    Success(serde_json::Value),
}

/// Execute a tagexpr check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let meta = compile(&options.exprs)?;
    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let document = parse_input(options.input.as_ref())?;
    let tag_expr = TagExpr::new(Arc::new(meta), &document);

    let mut results = Map::new();
    tag_expr.range(|selector, value| {
        results.insert(selector.to_string(), to_json(&value));
        true
    });
    Ok(CheckResult::Success(serde_json::Value::Object(results)))
}
