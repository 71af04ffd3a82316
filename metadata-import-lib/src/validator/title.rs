use super::{ValidationError, Validator};
use crate::parser::Parser;
use crate::streams::{SharedStream, TracingStream};

/// Requires every record to carry at least one title.
pub struct TitleValidator {
    error_stream: SharedStream,
}

impl TitleValidator {
    pub fn new(error_stream: SharedStream) -> Self {
        Self { error_stream }
    }
}

impl Default for TitleValidator {
    fn default() -> Self {
        Self::new(TracingStream::error().shared())
    }
}

impl Validator for TitleValidator {
    fn name(&self) -> &'static str {
        "TitleValidator"
    }

    fn error_stream(&self) -> &SharedStream {
        &self.error_stream
    }

    fn run_validation(&self, parser: &mut dyn Parser) -> Vec<ValidationError> {
        let records = match parser.records() {
            Ok(records) => records,
            Err(e) => {
                return vec![ValidationError::new(
                    self.name(),
                    "unreadable_source",
                    e.to_string(),
                )]
            }
        };

        records
            .filter(|record| record.titles().is_empty())
            .map(|record| {
                ValidationError::new(
                    self.name(),
                    "missing_title",
                    format!("Title is required; got {}", record.metadata()),
                )
            })
            .collect()
    }
}
