use super::{ValidationError, Validator};
use crate::parser::{read_csv_table, Parser};
use crate::streams::{SharedStream, TracingStream};

/// Checks that the parser's raw source is well-formed CSV.
///
/// A malformed source produces exactly one error, carrying the line of the
/// first offending row.
pub struct CsvFormatValidator {
    error_stream: SharedStream,
}

impl CsvFormatValidator {
    pub fn new(error_stream: SharedStream) -> Self {
        Self { error_stream }
    }
}

impl Default for CsvFormatValidator {
    fn default() -> Self {
        Self::new(TracingStream::error().shared())
    }
}

impl Validator for CsvFormatValidator {
    fn name(&self) -> &'static str {
        "CsvFormatValidator"
    }

    fn error_stream(&self) -> &SharedStream {
        &self.error_stream
    }

    fn run_validation(&self, parser: &mut dyn Parser) -> Vec<ValidationError> {
        let content = match parser.raw_content() {
            Ok(content) => content,
            Err(e) => {
                return vec![ValidationError::new(
                    self.name(),
                    "unreadable_source",
                    e.to_string(),
                )]
            }
        };

        match read_csv_table(&content) {
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::debug!("CSV format check failed: {}", e);
                let error = ValidationError::new(self.name(), "malformed_csv", e.to_string());
                match e.position() {
                    Some(position) => vec![error.at_line(position.line())],
                    None => vec![error],
                }
            }
        }
    }
}
