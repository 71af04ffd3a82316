use std::fs::File;
use std::io::Write;

use metadata_import::{
    Attributes, Depositor, Repository, RepositoryError, SaveOutcome, UploadRef,
};
use serde::Serialize;
use uuid::Uuid;

/// One line of the hand-off file.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum HandoffEntry<'a> {
    Create {
        id: String,
        #[serde(rename = "workType")]
        work_type: &'a str,
        depositor: &'a str,
        attributes: &'a Attributes,
    },
    Update {
        id: &'a str,
        #[serde(rename = "workType")]
        work_type: &'a str,
        depositor: &'a str,
        attributes: &'a Attributes,
    },
    Upload {
        id: String,
        filename: &'a str,
        owner: &'a str,
        size: u64,
    },
}

/// Writes every create, update and upload as a JSON line for a downstream
/// loader. It stores nothing, so deduplication lookups never match.
pub struct JsonLinesRepository<W: Write> {
    writer: W,
    work_type: String,
    lines: usize,
}

impl<W: Write> JsonLinesRepository<W> {
    pub fn new(writer: W, work_type: Option<&str>) -> Self {
        Self {
            writer,
            work_type: work_type.unwrap_or("Work").to_string(),
            lines: 0,
        }
    }

    pub fn lines_written(&self) -> usize {
        self.lines
    }

    fn write_entry(&mut self, entry: &HandoffEntry<'_>) -> Result<(), RepositoryError> {
        let line =
            serde_json::to_string(entry).map_err(|e| RepositoryError::Backend(e.to_string()))?;
        writeln!(self.writer, "{}", line).map_err(|e| RepositoryError::Backend(e.to_string()))?;
        self.writer
            .flush()
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        self.lines += 1;
        Ok(())
    }
}

impl<W: Write> Repository for JsonLinesRepository<W> {
    fn registered_types(&self) -> Vec<String> {
        vec![self.work_type.clone()]
    }

    fn create(
        &mut self,
        work_type: &str,
        attributes: &Attributes,
        actor: &Depositor,
    ) -> Result<SaveOutcome, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        self.write_entry(&HandoffEntry::Create {
            id: id.clone(),
            work_type,
            depositor: &actor.user_key,
            attributes,
        })?;
        Ok(SaveOutcome::Saved { id })
    }

    fn update(
        &mut self,
        work_type: &str,
        id: &str,
        attributes: &Attributes,
        actor: &Depositor,
    ) -> Result<SaveOutcome, RepositoryError> {
        self.write_entry(&HandoffEntry::Update {
            id,
            work_type,
            depositor: &actor.user_key,
            attributes,
        })?;
        Ok(SaveOutcome::Saved { id: id.to_string() })
    }

    fn find_by_field(
        &self,
        _work_type: &str,
        _field: &str,
        _value: &str,
    ) -> Result<Vec<String>, RepositoryError> {
        Ok(Vec::new())
    }

    fn register_upload(
        &mut self,
        file: File,
        filename: &str,
        owner: &Depositor,
    ) -> Result<UploadRef, RepositoryError> {
        let size = file
            .metadata()
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .len();
        let id = Uuid::new_v4().to_string();
        self.write_entry(&HandoffEntry::Upload {
            id: id.clone(),
            filename,
            owner: &owner.user_key,
            size,
        })?;
        Ok(UploadRef(id))
    }
}
