//! Validate JSON input against tag expressions

use super::{CliError, compile, parse_input};
use crate::validator::{ValidateError, ValidationError, Validator};

/// Options for the validate command
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// `path=tag` pairs
    pub exprs: Vec<String>,
    /// JSON input string
    pub input: Option<String>,
}

#[derive(Debug)]
pub enum ValidateOutcome {
    Valid,
    Invalid(ValidationError),
}

/// Execute a tagexpr validate operation
pub fn execute_validate(options: &ValidateOptions) -> Result<ValidateOutcome, CliError> {
    let meta = compile(&options.exprs)?;
    let document = parse_input(options.input.as_ref())?;

    match Validator::new("cli").validate_with(&meta, &document) {
        Ok(()) => Ok(ValidateOutcome::Valid),
        Err(ValidateError::Invalid(e)) => Ok(ValidateOutcome::Invalid(e)),
        Err(ValidateError::Registration(e)) => Err(CliError::Registration(e)),
        Err(e @ ValidateError::Custom(_)) => Err(CliError::Validation(e)),
    }
}
