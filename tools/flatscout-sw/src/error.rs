use std::process::ExitCode;

use flatscout_worker::{CacheError, ConfigError, WorkerError};

/// All errors produced by flatscout-sw.
///
/// Variants are split into two categories:
/// - **Infrastructure errors** (exit code 2): unreadable config, snapshot or stdin
/// - **Operational errors** (exit code 1): input the user can correct
#[derive(thiserror::Error, Debug)]
pub enum CliError {
    // ── Infrastructure errors (exit code 2) ──────────────────────────

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not render config: {0}")]
    Render(#[from] toml::ser::Error),

    // ── Operational errors (exit code 1) ─────────────────────────────

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid JSON input: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Worker error: {0}")]
    Worker(WorkerError),
}

impl From<WorkerError> for CliError {
    fn from(e: WorkerError) -> Self {
        match e {
            WorkerError::Config(e) => Self::Config(e),
            WorkerError::Cache(e) => Self::Snapshot(e),
            WorkerError::Json(e) => Self::InvalidJson(e),
            WorkerError::InvalidUrl(url) => Self::InvalidUrl(url),
            other => Self::Worker(other),
        }
    }
}

impl CliError {
    /// Numeric exit code.
    ///
    /// - `2` for infrastructure errors
    /// - `1` for operational errors
    pub fn code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Snapshot(_) | Self::Io(_) | Self::Render(_) => 2,
            Self::InvalidUrl(_)
            | Self::InvalidMethod(_)
            | Self::InvalidJson(_)
            | Self::Worker(_) => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}
