#![allow(dead_code)]

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Once};

use metadata_import::{
    Attributes, Depositor, FieldFailure, FieldValue, ImportConfig, MemoryStream, Repository,
    RepositoryError, SaveOutcome, UploadRef, DEFAULT_DELIMITER,
};

static INIT: Once = Once::new();

/// Initialize logging exactly once for all tests
pub fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    });
}

pub fn test_data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../test-data")
        .join(name)
}

/// A config writing to fresh in-memory streams, searching the fixture attachments.
pub fn memory_config() -> (ImportConfig, Arc<MemoryStream>, Arc<MemoryStream>) {
    let info = MemoryStream::new();
    let error = MemoryStream::new();
    let config = ImportConfig::default()
        .with_streams(info.clone(), error.clone())
        .with_import_path(test_data("attachments"));
    (config, info, error)
}

#[derive(Debug, Clone)]
pub struct StoredWork {
    pub id: String,
    pub work_type: String,
    pub attributes: Attributes,
    pub depositor: String,
}

#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub id: String,
    pub filename: String,
    pub owner: String,
    pub size: usize,
}

/// In-memory repository with switchable failure modes keyed on record title.
#[derive(Debug)]
pub struct FakeRepository {
    pub types: Vec<String>,
    pub works: Vec<StoredWork>,
    pub uploads: Vec<StoredUpload>,
    pub create_calls: usize,
    pub update_calls: usize,
    /// Titles rejected with a field-level failure.
    pub invalid_titles: Vec<String>,
    /// Titles whose save fails with a connection error.
    pub unreachable_titles: Vec<String>,
    /// Titles whose save fails with a backend error.
    pub broken_titles: Vec<String>,
}

impl Default for FakeRepository {
    fn default() -> Self {
        Self {
            types: vec!["Work".into()],
            works: Vec::new(),
            uploads: Vec::new(),
            create_calls: 0,
            update_calls: 0,
            invalid_titles: Vec::new(),
            unreachable_titles: Vec::new(),
            broken_titles: Vec::new(),
        }
    }
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_types() -> Self {
        Self {
            types: Vec::new(),
            ..Self::default()
        }
    }

    pub fn work(&self, id: &str) -> Option<&StoredWork> {
        self.works.iter().find(|work| work.id == id)
    }

    pub fn seed(&mut self, field: &str, value: &str) -> String {
        let id = format!("seed-{}", self.works.len() + 1);
        let mut attributes = Attributes::new();
        attributes.insert(field.to_string(), FieldValue::Multi(vec![value.to_string()]));
        self.works.push(StoredWork {
            id: id.clone(),
            work_type: "Work".into(),
            attributes,
            depositor: "seed@example.com".into(),
        });
        id
    }

    fn first_title(attributes: &Attributes) -> String {
        match attributes.get("title") {
            Some(FieldValue::Multi(titles)) => titles.first().cloned().unwrap_or_default(),
            _ => String::new(),
        }
    }

    fn check(&self, attributes: &Attributes) -> Result<Option<SaveOutcome>, RepositoryError> {
        let title = Self::first_title(attributes);
        if self.unreachable_titles.contains(&title) {
            return Err(RepositoryError::Connection(format!("timed out saving {}", title)));
        }
        if self.broken_titles.contains(&title) {
            return Err(RepositoryError::Backend(format!("could not save {}", title)));
        }
        if self.invalid_titles.contains(&title) {
            return Ok(Some(SaveOutcome::Invalid(vec![FieldFailure::new(
                "title",
                "is not allowed",
            )])));
        }
        Ok(None)
    }
}

impl Repository for FakeRepository {
    fn registered_types(&self) -> Vec<String> {
        self.types.clone()
    }

    fn create(
        &mut self,
        work_type: &str,
        attributes: &Attributes,
        actor: &Depositor,
    ) -> Result<SaveOutcome, RepositoryError> {
        self.create_calls += 1;
        if let Some(outcome) = self.check(attributes)? {
            return Ok(outcome);
        }
        let id = format!("work-{}", self.works.len() + 1);
        self.works.push(StoredWork {
            id: id.clone(),
            work_type: work_type.to_string(),
            attributes: attributes.clone(),
            depositor: actor.user_key.clone(),
        });
        Ok(SaveOutcome::Saved { id })
    }

    fn update(
        &mut self,
        _work_type: &str,
        id: &str,
        attributes: &Attributes,
        _actor: &Depositor,
    ) -> Result<SaveOutcome, RepositoryError> {
        self.update_calls += 1;
        if let Some(outcome) = self.check(attributes)? {
            return Ok(outcome);
        }
        let work = self
            .works
            .iter_mut()
            .find(|work| work.id == id)
            .ok_or_else(|| RepositoryError::Backend(format!("no work {}", id)))?;
        work.attributes.extend(attributes.clone());
        Ok(SaveOutcome::Saved { id: id.to_string() })
    }

    fn find_by_field(
        &self,
        work_type: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .works
            .iter()
            .filter(|work| work.work_type == work_type)
            .filter(|work| {
                work.attributes
                    .get(field)
                    .and_then(|stored| stored.to_lookup_text(DEFAULT_DELIMITER))
                    .as_deref()
                    == Some(value)
            })
            .map(|work| work.id.clone())
            .collect())
    }

    fn register_upload(
        &mut self,
        mut file: File,
        filename: &str,
        owner: &Depositor,
    ) -> Result<UploadRef, RepositoryError> {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        let id = format!("upload-{}", self.uploads.len() + 1);
        self.uploads.push(StoredUpload {
            id: id.clone(),
            filename: filename.to_string(),
            owner: owner.user_key.clone(),
            size: bytes.len(),
        });
        Ok(UploadRef(id))
    }
}
