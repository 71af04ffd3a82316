use std::fs::File;
use std::path::{Path, PathBuf};

use super::{
    find_file_path, report_failures, resolve_work_type, settle, BatchCounters, RecordImport,
};
use crate::config::{DepositorPolicy, ImportConfig, ImportSettings};
use crate::error::ImportError;
use crate::mapper::{based_near_attributes, FieldValue};
use crate::record::{Attributes, InputRecord};
use crate::repository::{Depositor, Repository, SaveOutcome, UploadRef};
use crate::streams::SharedStream;

/// Upserting importer for works.
///
/// When a deduplication field is configured and the record carries a value
/// for it, an existing work with the same stored value is updated instead of
/// creating a new one. Updates never re-attach files.
pub struct WorkRecordImporter<R: Repository> {
    repository: R,
    info_stream: SharedStream,
    error_stream: SharedStream,
    import_path: PathBuf,
    batch_id: Option<String>,
    collection_id: Option<String>,
    deduplication_field: Option<String>,
    work_type: Option<String>,
    depositor: Depositor,
    depositor_policy: DepositorPolicy,
    counters: BatchCounters,
}

/// A deduplication hit: the field, the value looked up, and the stored id.
struct ExistingWork {
    field: String,
    value: String,
    id: String,
}

impl<R: Repository> WorkRecordImporter<R> {
    pub fn new(repository: R, config: &ImportConfig, settings: &ImportSettings) -> Self {
        Self {
            repository,
            info_stream: config.info_stream.clone(),
            error_stream: config.error_stream.clone(),
            import_path: config.import_path.clone(),
            batch_id: settings.batch_id.clone(),
            collection_id: settings.collection_id.clone(),
            deduplication_field: settings.deduplication_field.clone(),
            work_type: settings.work_type.clone(),
            depositor: Depositor::new(settings.depositor()),
            depositor_policy: settings.depositor_policy,
            counters: BatchCounters::default(),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn into_repository(self) -> R {
        self.repository
    }

    pub fn depositor(&self) -> &Depositor {
        &self.depositor
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.collection_id.as_deref()
    }

    pub fn deduplication_field(&self) -> Option<&str> {
        self.deduplication_field.as_deref()
    }

    /// Root searched for attachment files.
    pub fn file_attachments_path(&self) -> &Path {
        &self.import_path
    }

    pub fn import_type(&self) -> Result<String, ImportError> {
        resolve_work_type(self.work_type.as_deref(), &self.repository)
    }

    /// The record's deduplication key and value, if it has a usable one.
    fn deduplication_key(&self, record: &InputRecord) -> Result<Option<(String, String)>, ImportError> {
        let Some(field) = self.deduplication_field.as_deref() else {
            return Ok(None);
        };
        if !record.has_field(field) {
            return Ok(None);
        }
        Ok(record
            .field(field)?
            .to_lookup_text(record.mapper().delimiter())
            .map(|value| (field.to_string(), value)))
    }

    fn find_existing_record(&self, record: &InputRecord) -> Result<Option<ExistingWork>, ImportError> {
        let Some((field, value)) = self.deduplication_key(record)? else {
            return Ok(None);
        };
        let work_type = self.import_type()?;
        let mut ids = self.repository.find_by_field(&work_type, &field, &value)?;
        match ids.len() {
            0 => Ok(None),
            1 => Ok(ids.pop().map(|id| ExistingWork { field, value, id })),
            count => Err(ImportError::AmbiguousMatch {
                field,
                value,
                count,
            }),
        }
    }

    /// Registers every file named in the record's `files` field as an upload.
    pub fn create_upload_files(&mut self, record: &InputRecord) -> Result<Vec<UploadRef>, ImportError> {
        if !record.has_field("files") {
            return Ok(Vec::new());
        }
        let filenames = match record.field("files")? {
            FieldValue::Multi(values) => values,
            FieldValue::Single(Some(value)) => vec![value],
            _ => Vec::new(),
        };

        let mut uploads = Vec::with_capacity(filenames.len());
        for filename in filenames {
            let path = find_file_path(&self.import_path, &filename)?;
            let file = File::open(&path)?;
            tracing::debug!("Registering upload {}", path.display());
            uploads.push(
                self.repository
                    .register_upload(file, &filename, &self.depositor)?,
            );
        }
        Ok(uploads)
    }

    fn build_attributes(
        &self,
        record: &InputRecord,
        uploads: Option<Vec<UploadRef>>,
    ) -> Result<Attributes, ImportError> {
        let mut attributes = record.attributes()?;
        attributes.remove("files");

        let record_depositor = attributes
            .get("depositor")
            .and_then(FieldValue::as_single)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string);
        let depositor = match (self.depositor_policy, record_depositor) {
            (DepositorPolicy::PreferRecord, Some(value)) => value,
            _ => self.depositor.user_key.clone(),
        };
        attributes.insert("depositor".into(), FieldValue::Single(Some(depositor)));

        if let Some(uploads) = uploads {
            attributes.insert(
                "uploaded_files".into(),
                FieldValue::Multi(uploads.into_iter().map(|upload| upload.0).collect()),
            );
        }

        if let Some(collection_id) = &self.collection_id {
            attributes.insert(
                "member_of_collections_attributes".into(),
                FieldValue::Structured(serde_json::json!({ "0": { "id": collection_id } })),
            );
        }

        if let Some(based_near) = attributes.remove("based_near") {
            let uris = match based_near {
                FieldValue::Multi(values) => values,
                FieldValue::Single(Some(value)) => vec![value],
                _ => Vec::new(),
            };
            if let Some(structured) = based_near_attributes(&uris) {
                attributes.insert(
                    "based_near_attributes".into(),
                    FieldValue::Structured(structured),
                );
            }
        }

        Ok(attributes)
    }

    fn title_of(attributes: &Attributes, record: &InputRecord) -> String {
        match attributes.get("title") {
            Some(FieldValue::Multi(titles)) => titles.first().cloned().unwrap_or_default(),
            Some(FieldValue::Single(Some(title))) => title.clone(),
            _ => record.to_string(),
        }
    }

    fn create_for(&mut self, record: &InputRecord) -> Result<(), ImportError> {
        self.info_stream.write_message(&format!(
            "event: record_import_started, batch_id: {}, collection_id: {}, record_title: {}",
            self.batch_id.as_deref().unwrap_or_default(),
            self.collection_id.as_deref().unwrap_or_default(),
            record
        ));

        let work_type = self.import_type()?;
        let uploads = self.create_upload_files(record)?;
        let attributes = self.build_attributes(record, Some(uploads))?;

        match self
            .repository
            .create(&work_type, &attributes, &self.depositor)?
        {
            SaveOutcome::Saved { id } => {
                self.info_stream.write_message(&format!(
                    "event: record_created, batch_id: {}, record_id: {}, collection_id: {}, record_title: {}",
                    self.batch_id.as_deref().unwrap_or_default(),
                    id,
                    self.collection_id.as_deref().unwrap_or_default(),
                    Self::title_of(&attributes, record)
                ));
                self.counters.record_success();
            }
            SaveOutcome::Invalid(failures) => {
                report_failures(
                    &failures,
                    self.batch_id.as_deref(),
                    self.collection_id.as_deref(),
                    &record.to_string(),
                    &self.error_stream,
                );
                self.counters.record_failure();
            }
        }
        Ok(())
    }

    fn update_for(&mut self, existing: ExistingWork, record: &InputRecord) -> Result<(), ImportError> {
        self.info_stream.write_message(&format!(
            "event: record_update_started, batch_id: {}, collection_id: {}, {}: {}",
            self.batch_id.as_deref().unwrap_or_default(),
            self.collection_id.as_deref().unwrap_or_default(),
            existing.field,
            existing.value
        ));

        let work_type = self.import_type()?;
        let attributes = self.build_attributes(record, None)?;

        match self
            .repository
            .update(&work_type, &existing.id, &attributes, &self.depositor)?
        {
            SaveOutcome::Saved { id } => {
                self.info_stream.write_message(&format!(
                    "event: record_updated, batch_id: {}, record_id: {}, collection_id: {}, {}: {}",
                    self.batch_id.as_deref().unwrap_or_default(),
                    id,
                    self.collection_id.as_deref().unwrap_or_default(),
                    existing.field,
                    existing.value
                ));
                self.counters.record_success();
            }
            SaveOutcome::Invalid(failures) => {
                report_failures(
                    &failures,
                    self.batch_id.as_deref(),
                    self.collection_id.as_deref(),
                    &record.to_string(),
                    &self.error_stream,
                );
                self.counters.record_failure();
            }
        }
        Ok(())
    }

    fn upsert(&mut self, record: &InputRecord) -> Result<(), ImportError> {
        match self.find_existing_record(record)? {
            Some(existing) => self.update_for(existing, record),
            None => self.create_for(record),
        }
    }
}

impl<R: Repository> RecordImport for WorkRecordImporter<R> {
    fn import(&mut self, record: &InputRecord) -> Result<(), ImportError> {
        let result = self.upsert(record);
        settle(
            result,
            self.batch_id.as_deref(),
            &self.error_stream,
            &mut self.counters,
        )
    }

    fn batch_id(&self) -> Option<&str> {
        self.batch_id.as_deref()
    }

    fn success_count(&self) -> usize {
        self.counters.success
    }

    fn failure_count(&self) -> usize {
        self.counters.failure
    }

    fn info_stream(&self) -> &SharedStream {
        &self.info_stream
    }

    fn error_stream(&self) -> &SharedStream {
        &self.error_stream
    }
}
