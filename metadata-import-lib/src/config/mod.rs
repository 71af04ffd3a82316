use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use json_comments::StripComments;
use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::mapper::DEFAULT_DELIMITER;
use crate::streams::{LogStream, Severity, SharedStream, TracingStream};

pub const IMPORT_PATH_ENV: &str = "IMPORT_PATH";
pub const DEFAULT_IMPORT_PATH: &str = "/opt/data";
pub const DEFAULT_DEPOSITOR: &str = "batchuser@example.com";

/// Process-level wiring shared by parsers, validators and importers.
#[derive(Clone)]
pub struct ImportConfig {
    pub info_stream: SharedStream,
    pub error_stream: SharedStream,
    /// Root directory searched (recursively) for file attachments.
    pub import_path: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            info_stream: TracingStream::info().shared(),
            error_stream: TracingStream::error().shared(),
            import_path: PathBuf::from(DEFAULT_IMPORT_PATH),
        }
    }
}

impl ImportConfig {
    /// Reads `IMPORT_PATH` and `IMPORT_LOG`, logging both streams to the same file.
    pub fn from_env() -> Result<Self, ImportError> {
        let import_path = std::env::var_os(IMPORT_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IMPORT_PATH));
        Ok(Self {
            info_stream: Arc::new(LogStream::from_env(Severity::Info)?),
            error_stream: Arc::new(LogStream::from_env(Severity::Error)?),
            import_path,
        })
    }

    pub fn with_streams(mut self, info_stream: SharedStream, error_stream: SharedStream) -> Self {
        self.info_stream = info_stream;
        self.error_stream = error_stream;
        self
    }

    pub fn with_import_path(mut self, import_path: impl Into<PathBuf>) -> Self {
        self.import_path = import_path.into();
        self
    }
}

/// Whether a depositor value found in the record may replace the batch user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DepositorPolicy {
    /// The importer's acting identity always wins.
    #[default]
    AlwaysBatchUser,
    PreferRecord,
}

/// Per-batch settings, usually loaded from a JSONC file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImportSettings {
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub depositor: Option<String>,
    #[serde(default)]
    pub deduplication_field: Option<String>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub institution_name: Option<String>,
    #[serde(default)]
    pub work_type: Option<String>,
    #[serde(default)]
    pub depositor_policy: DepositorPolicy,
}

impl ImportSettings {
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Result<Self, ImportError> {
        let path = path.into();
        tracing::info!("Loading import settings from {:?}", path);
        let file = std::fs::File::open(&path)?;
        let settings = Self::from_reader(file)?;
        tracing::info!("Successfully loaded settings: {}", path.display());
        Ok(settings)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ImportError> {
        Ok(serde_json::from_reader(StripComments::new(reader))?)
    }

    pub fn validate(&self) -> Result<(), ImportError> {
        if let Some(delimiter) = &self.delimiter {
            if delimiter.is_empty() {
                tracing::error!("Empty delimiter in import settings");
                return Err(ImportError::Configuration(
                    "delimiter must not be empty".into(),
                ));
            }
        }
        if let Some(field) = &self.deduplication_field {
            if field.trim().is_empty() {
                tracing::error!("Blank deduplication field in import settings");
                return Err(ImportError::Configuration(
                    "deduplicationField must name a field".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn delimiter(&self) -> &str {
        self.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER)
    }

    pub fn depositor(&self) -> &str {
        self.depositor.as_deref().unwrap_or(DEFAULT_DEPOSITOR)
    }

    /// The configured batch id, or a fresh v4 uuid.
    pub fn batch_id_or_generate(&self) -> String {
        self.batch_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}
