//! Message sinks for the user-visible `event: ...` lines of an import run.

mod formatted;
mod log;

pub use formatted::FormattedMessageStream;
pub use log::{log_path_from_env, LogStream, DEFAULT_LOG_PATH, IMPORT_LOG_ENV};

use std::sync::{Arc, Mutex};

/// Anything that accepts one message at a time.
pub trait MessageStream: Send + Sync {
    fn write_message(&self, message: &str);
}

pub type SharedStream = Arc<dyn MessageStream>;

/// Severity used by [`TracingStream`] and [`LogStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// Forwards messages as `tracing` events.
#[derive(Debug, Clone, Copy)]
pub struct TracingStream {
    severity: Severity,
}

impl TracingStream {
    pub fn new(severity: Severity) -> Self {
        Self { severity }
    }

    pub fn info() -> Self {
        Self::new(Severity::Info)
    }

    pub fn error() -> Self {
        Self::new(Severity::Error)
    }

    pub fn shared(self) -> SharedStream {
        Arc::new(self)
    }
}

impl MessageStream for TracingStream {
    fn write_message(&self, message: &str) {
        match self.severity {
            Severity::Debug => tracing::debug!(target: "metadata_import::stream", "{}", message),
            Severity::Info => tracing::info!(target: "metadata_import::stream", "{}", message),
            Severity::Warn => tracing::warn!(target: "metadata_import::stream", "{}", message),
            Severity::Error => tracing::error!(target: "metadata_import::stream", "{}", message),
        }
    }
}

/// Keeps every message in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryStream {
    messages: Mutex<Vec<String>>,
}

impl MemoryStream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages containing `needle`.
    pub fn matching(&self, needle: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.contains(needle))
            .collect()
    }
}

impl MessageStream for MemoryStream {
    fn write_message(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
