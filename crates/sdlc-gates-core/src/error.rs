use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown gate: {0}")]
    UnknownGate(String),

    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    #[error("invalid level: {0}")]
    InvalidLevel(String),

    #[error("approval ledger {} changed since it was loaded", path.display())]
    LedgerConflict { path: PathBuf },

    #[error("timed out waiting for lock {}", path.display())]
    LedgerLocked { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GateError {
    /// True when the caller asked for something that does not exist, as
    /// opposed to a requirement that is not yet satisfied or an I/O failure.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            GateError::UnknownGate(_) | GateError::InvalidPhase(_) | GateError::InvalidLevel(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
