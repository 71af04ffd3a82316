//! Batch import: the [`Importer`] pulls records from a parser and hands each
//! one to a [`RecordImport`] implementation, which talks to the repository.

mod attachments;
mod record_importer;
mod work_importer;

pub use attachments::find_file_path;
pub use record_importer::RecordImporter;
pub use work_importer::WorkRecordImporter;

use std::time::Instant;

use crate::error::ImportError;
use crate::parser::{Parser, Records};
use crate::record::InputRecord;
use crate::repository::{FieldFailure, Repository};
use crate::streams::SharedStream;
use crate::utils::format_seconds;

/// Imports one record at a time and keeps the batch tallies.
pub trait RecordImport {
    /// Imports one record. `Err` means the batch must stop.
    fn import(&mut self, record: &InputRecord) -> Result<(), ImportError>;

    fn batch_id(&self) -> Option<&str>;

    fn success_count(&self) -> usize;

    fn failure_count(&self) -> usize;

    fn info_stream(&self) -> &SharedStream;

    fn error_stream(&self) -> &SharedStream;
}

/// Running success/failure totals. Only ever increase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchCounters {
    pub success: usize,
    pub failure: usize,
}

impl BatchCounters {
    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self) {
        self.failure += 1;
    }

    pub fn total(&self) -> usize {
        self.success + self.failure
    }
}

pub struct Importer<I: RecordImport> {
    parser: Box<dyn Parser>,
    record_importer: I,
}

impl<I: RecordImport> Importer<I> {
    pub fn new(parser: Box<dyn Parser>, record_importer: I) -> Self {
        Self {
            parser,
            record_importer,
        }
    }

    pub fn records(&mut self) -> Result<Records<'_>, ImportError> {
        self.parser.records()
    }

    pub fn parser(&mut self) -> &mut dyn Parser {
        self.parser.as_mut()
    }

    pub fn record_importer(&self) -> &I {
        &self.record_importer
    }

    pub fn into_record_importer(self) -> I {
        self.record_importer
    }

    /// Imports every record in source order.
    pub fn import(&mut self) -> Result<(), ImportError> {
        let batch_id = self.record_importer.batch_id().unwrap_or_default().to_string();
        let info_stream = self.record_importer.info_stream().clone();
        let error_stream = self.record_importer.error_stream().clone();

        let expected = self.parser.record_count()?;
        if expected == 0 {
            let message = format!("event: empty_batch, batch_id: {}", batch_id);
            tracing::warn!("No records found in {}", self.parser.source_name().display());
            info_stream.write_message(&message);
            error_stream.write_message(&message);
            return Ok(());
        }

        info_stream.write_message(&format!(
            "event: start_import, batch_id: {}, expected_records: {}",
            batch_id, expected
        ));
        tracing::info!("Importing {} records from {}", expected, self.parser.source_name().display());

        let started = Instant::now();
        let mut processed = 0usize;
        for record in self.parser.records()? {
            self.record_importer.import(&record)?;
            processed += 1;
        }
        let elapsed = started.elapsed().as_secs_f64();
        let per_record = elapsed / processed.max(1) as f64;

        info_stream.write_message(&format!(
            "event: finish_import, batch_id: {}, successful_record_count: {}, failed_record_count: {}, elapsed_time: {}, elapsed_time_per_record: {}",
            batch_id,
            self.record_importer.success_count(),
            self.record_importer.failure_count(),
            format_seconds(elapsed),
            format_seconds(per_record)
        ));
        tracing::info!("Processed {} records in {}", processed, format_seconds(elapsed));
        Ok(())
    }
}

/// The configured work type, else the repository's first registered type.
pub(crate) fn resolve_work_type<R: Repository>(
    configured: Option<&str>,
    repository: &R,
) -> Result<String, ImportError> {
    if let Some(work_type) = configured {
        return Ok(work_type.to_string());
    }
    repository
        .registered_types()
        .into_iter()
        .next()
        .ok_or_else(|| ImportError::Configuration("No work type found for import".into()))
}

/// Applies the batch error policy to the outcome of one import: transient
/// repository failures are logged and swallowed, everything else is logged
/// and returned.
pub(crate) fn settle(
    result: Result<(), ImportError>,
    batch_id: Option<&str>,
    error_stream: &SharedStream,
    counters: &mut BatchCounters,
) -> Result<(), ImportError> {
    match result {
        Ok(()) => Ok(()),
        Err(ImportError::Repository(e)) if e.is_transient() => {
            tracing::warn!("Repository unavailable: {}", e);
            error_stream.write_message(&format!(
                "event: repository_unavailable, batch_id: {}, message: {}",
                batch_id.unwrap_or_default(),
                e
            ));
            counters.record_failure();
            Ok(())
        }
        Err(e) => {
            tracing::error!("Import failed: {}", e);
            error_stream.write_message(&format!(
                "event: import_failed, batch_id: {}, message: {}",
                batch_id.unwrap_or_default(),
                e
            ));
            Err(e)
        }
    }
}

pub(crate) fn report_failures(
    failures: &[FieldFailure],
    batch_id: Option<&str>,
    collection_id: Option<&str>,
    record_title: &str,
    error_stream: &SharedStream,
) {
    for failure in failures {
        error_stream.write_message(&format!(
            "event: validation_failed, batch_id: {}, collection_id: {}, attribute: {}, message: {}, record_title: {}",
            batch_id.unwrap_or_default(),
            collection_id.unwrap_or_default(),
            capitalize(&failure.attribute),
            failure.message,
            record_title
        ));
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
