use std::io;

/// Crate-wide error taxonomy.
///
/// `Connection` is fatal for a run; `Query` is recoverable at the call site
/// (a monitoring pass degrades the affected check instead of aborting);
/// `Notification` failures are logged and never retried.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("notification error: {0}")]
    Notification(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("artifact error: {0}")]
    Artifact(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
