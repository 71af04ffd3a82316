//! The persistence boundary. Record importers only ever talk to a repository
//! through [`Repository`]; storage, access control and upload handling
//! belong to the implementation.

use std::fmt;
use std::fs::File;

use serde::Serialize;

use crate::error::RepositoryError;
use crate::record::Attributes;

/// One field-level validation failure reported by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFailure {
    pub attribute: String,
    pub message: String,
}

impl FieldFailure {
    pub fn new(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            message: message.into(),
        }
    }
}

/// What the repository made of a create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { id: String },
    Invalid(Vec<FieldFailure>),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

/// Handle returned by [`Repository::register_upload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRef(pub String);

impl fmt::Display for UploadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The acting identity for a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depositor {
    pub user_key: String,
}

impl Depositor {
    pub fn new(user_key: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
        }
    }
}

pub trait Repository {
    /// Work types the repository can create, in preference order.
    fn registered_types(&self) -> Vec<String>;

    fn create(
        &mut self,
        work_type: &str,
        attributes: &Attributes,
        actor: &Depositor,
    ) -> Result<SaveOutcome, RepositoryError>;

    fn update(
        &mut self,
        work_type: &str,
        id: &str,
        attributes: &Attributes,
        actor: &Depositor,
    ) -> Result<SaveOutcome, RepositoryError>;

    /// Ids of stored works whose `field` equals `value` as text.
    fn find_by_field(
        &self,
        work_type: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<String>, RepositoryError>;

    fn register_upload(
        &mut self,
        file: File,
        filename: &str,
        owner: &Depositor,
    ) -> Result<UploadRef, RepositoryError>;
}
