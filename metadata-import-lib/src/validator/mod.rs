//! Validators inspect a parser's records (or its raw source) and report
//! problems as [`ValidationError`] values. Every reported error is also
//! written to the validator's error stream.

mod csv_format;
mod title;

pub use csv_format::CsvFormatValidator;
pub use title::TitleValidator;

use std::fmt;

use serde::Serialize;

use crate::parser::Parser;
use crate::streams::{SharedStream, TracingStream};

/// A recoverable problem found during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub validator: String,
    pub name: String,
    pub description: String,
    pub lineno: Option<u64>,
}

impl ValidationError {
    pub fn new(
        validator: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            validator: validator.into(),
            name: name.into(),
            description: description.into(),
            lineno: None,
        }
    }

    pub fn at_line(mut self, lineno: u64) -> Self {
        self.lineno = Some(lineno);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "event: validation_error, validator: {}, error: {}, description: {}",
            self.validator, self.name, self.description
        )?;
        if let Some(lineno) = self.lineno {
            write!(f, ", line: {}", lineno)?;
        }
        Ok(())
    }
}

pub trait Validator: Send {
    fn name(&self) -> &'static str;

    fn error_stream(&self) -> &SharedStream;

    /// The checks themselves; [`Validator::validate`] wraps this.
    fn run_validation(&self, parser: &mut dyn Parser) -> Vec<ValidationError>;

    fn validate(&self, parser: &mut dyn Parser) -> Vec<ValidationError> {
        let errors = self.run_validation(parser);
        for error in &errors {
            self.error_stream().write_message(&error.to_string());
        }
        errors
    }
}

/// Reports nothing.
pub struct NullValidator {
    error_stream: SharedStream,
}

impl NullValidator {
    pub fn new(error_stream: SharedStream) -> Self {
        Self { error_stream }
    }
}

impl Default for NullValidator {
    fn default() -> Self {
        Self::new(TracingStream::error().shared())
    }
}

impl Validator for NullValidator {
    fn name(&self) -> &'static str {
        "NullValidator"
    }

    fn error_stream(&self) -> &SharedStream {
        &self.error_stream
    }

    fn run_validation(&self, _parser: &mut dyn Parser) -> Vec<ValidationError> {
        Vec::new()
    }
}

/// Reports a single `everytime` error on every run.
pub struct AlwaysInvalidValidator {
    error_stream: SharedStream,
}

impl AlwaysInvalidValidator {
    pub fn new(error_stream: SharedStream) -> Self {
        Self { error_stream }
    }
}

impl Default for AlwaysInvalidValidator {
    fn default() -> Self {
        Self::new(TracingStream::error().shared())
    }
}

impl Validator for AlwaysInvalidValidator {
    fn name(&self) -> &'static str {
        "AlwaysInvalidValidator"
    }

    fn error_stream(&self) -> &SharedStream {
        &self.error_stream
    }

    fn run_validation(&self, _parser: &mut dyn Parser) -> Vec<ValidationError> {
        vec![ValidationError::new(self.name(), "everytime", "always invalid")]
    }
}
