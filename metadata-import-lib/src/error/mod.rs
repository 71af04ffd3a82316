use std::path::PathBuf;

use thiserror::Error;

use crate::validator::ValidationError;

/// Fatal errors. Anything returned as `Err(ImportError)` stops the current
/// operation; recoverable problems travel as [`ValidationError`] values or as
/// [`crate::repository::SaveOutcome::Invalid`].
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("No parser found for input: {0}")]
    UnsupportedInput(String),
    #[error("Unsupported field: {0}")]
    UnsupportedField(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error(
        "More than one record matches deduplication_field {field} with value {value} ({count} matches)"
    )]
    AmbiguousMatch {
        field: String,
        value: String,
        count: usize,
    },
    #[error(
        "Cannot find file {filename} under {}... Are you sure it has been uploaded and that the filename matches?",
        root.display()
    )]
    MissingAttachment { filename: String, root: PathBuf },
    #[error("Validation failed with {} error(s)", .0.len())]
    Validation(Vec<ValidationError>),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Failures reported by a persistence boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The repository could not be reached or answered with a protocol error.
    /// Record importers log these and move on to the next record.
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("{0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Connection(_))
    }
}

/// Validation errors collected by a parser. Append-only between resets.
#[derive(Debug, Default, Clone)]
pub struct ValidationState {
    errors: Vec<ValidationError>,
}

impl ValidationState {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.errors.extend(errors);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn get_errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn merge(&mut self, other: ValidationState) {
        self.errors.extend(other.errors);
    }
}
