//! Error types for the stats poller and the interval scheduler.

use std::path::PathBuf;

/// Errors raised while talking to memcached or serving the gmond interface.
#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("I/O error talking to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection is not open")]
    NotConnected,

    #[error("Malformed stats line: {0:?}")]
    MalformedLine(String),

    #[error("Server returned an error: {0}")]
    Server(String),

    #[error("Metric '{0}' not reported by memcached")]
    UnknownMetric(String),

    #[error("Failed to read metric descriptors from {path}: {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse metric descriptors in {path}: {source}")]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value '{value}' for parameter '{key}'")]
    InvalidParam { key: String, value: String },
}

/// Errors raised when starting a repeating task.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Interval must be greater than zero")]
    ZeroInterval,

    #[error("No tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

pub type Result<T, E = PollerError> = std::result::Result<T, E>;
