use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{MessageStream, Severity};
use crate::error::ImportError;

pub const IMPORT_LOG_ENV: &str = "IMPORT_LOG";
pub const DEFAULT_LOG_PATH: &str = "./log/metadata_import.log";
const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Appends timestamped lines to a log file and echoes them to stdout.
///
/// Once the file at `path` grows past `max_bytes` it is moved to `<path>.1`
/// (replacing any previous rotation) and a fresh file is started. The file is
/// reopened by path for every line, so several streams may share one path.
pub struct LogStream {
    path: PathBuf,
    severity: Severity,
    max_bytes: u64,
    echo: bool,
    lock: Mutex<()>,
}

impl LogStream {
    pub fn open(path: impl Into<PathBuf>, severity: Severity) -> Result<Self, ImportError> {
        let path = path.into();
        open_append(&path)?;
        tracing::debug!("Opened import log at {}", path.display());
        Ok(Self {
            path,
            severity,
            max_bytes: DEFAULT_MAX_BYTES,
            echo: true,
            lock: Mutex::new(()),
        })
    }

    /// Log file from `IMPORT_LOG`, falling back to [`DEFAULT_LOG_PATH`].
    pub fn from_env(severity: Severity) -> Result<Self, ImportError> {
        Self::open(log_path_from_env(), severity)
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn without_echo(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotated_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".1");
        PathBuf::from(name)
    }

    /// Sizes the file currently at `path`, not a previously opened handle.
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        let size = match fs::metadata(&self.path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e),
        };
        if size < self.max_bytes {
            return Ok(());
        }
        fs::rename(&self.path, self.rotated_path())
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?;
        self.rotate_if_needed()?;
        let mut file = open_append(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl MessageStream for LogStream {
    fn write_message(&self, message: &str) {
        let line = format!(
            "{} {:>5} {}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"),
            self.severity.as_str(),
            message
        );
        if let Err(e) = self.append(&line) {
            tracing::warn!("Failed to write to import log {}: {}", self.path.display(), e);
        }
        if self.echo {
            println!("{}", message);
        }
    }
}

pub fn log_path_from_env() -> PathBuf {
    std::env::var_os(IMPORT_LOG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH))
}

fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
