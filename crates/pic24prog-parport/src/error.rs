//! Error types for parallel port operations

use thiserror::Error;

/// Parallel port specific errors
#[derive(Debug, Error)]
pub enum ParportError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A ppdev ioctl failed
    #[error("{op} failed: {source}")]
    Ioctl {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Port used before it was claimed
    #[error("Parallel port is not claimed")]
    NotClaimed,
}

impl From<ParportError> for pic24prog_core::Error {
    fn from(e: ParportError) -> Self {
        match e {
            ParportError::NotClaimed => Self::DriverNotOpen,
            _ => Self::Transport,
        }
    }
}

/// Result type for parallel port operations
pub type Result<T> = std::result::Result<T, ParportError>;
