use super::{report_failures, resolve_work_type, settle, BatchCounters, RecordImport};
use crate::config::{ImportConfig, DEFAULT_DEPOSITOR};
use crate::error::ImportError;
use crate::record::InputRecord;
use crate::repository::{Depositor, Repository, SaveOutcome};
use crate::streams::SharedStream;

/// Creates one work per record from the record's attributes, unchanged.
pub struct RecordImporter<R: Repository> {
    repository: R,
    info_stream: SharedStream,
    error_stream: SharedStream,
    batch_id: Option<String>,
    work_type: Option<String>,
    depositor: Depositor,
    counters: BatchCounters,
}

impl<R: Repository> RecordImporter<R> {
    pub fn new(repository: R, config: &ImportConfig) -> Self {
        Self {
            repository,
            info_stream: config.info_stream.clone(),
            error_stream: config.error_stream.clone(),
            batch_id: None,
            work_type: None,
            depositor: Depositor::new(DEFAULT_DEPOSITOR),
            counters: BatchCounters::default(),
        }
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn with_work_type(mut self, work_type: impl Into<String>) -> Self {
        self.work_type = Some(work_type.into());
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn import_type(&self) -> Result<String, ImportError> {
        resolve_work_type(self.work_type.as_deref(), &self.repository)
    }

    fn create_for(&mut self, record: &InputRecord) -> Result<(), ImportError> {
        self.info_stream
            .write_message(&format!("Creating record: {}.", record));

        let work_type = self.import_type()?;
        let attributes = record.attributes()?;
        match self
            .repository
            .create(&work_type, &attributes, &self.depositor)?
        {
            SaveOutcome::Saved { id } => {
                self.info_stream
                    .write_message(&format!("Record created at: {}", id));
                self.counters.record_success();
            }
            SaveOutcome::Invalid(failures) => {
                report_failures(
                    &failures,
                    self.batch_id.as_deref(),
                    None,
                    &record.to_string(),
                    &self.error_stream,
                );
                self.counters.record_failure();
            }
        }
        Ok(())
    }
}

impl<R: Repository> RecordImport for RecordImporter<R> {
    fn import(&mut self, record: &InputRecord) -> Result<(), ImportError> {
        let result = self.create_for(record);
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
