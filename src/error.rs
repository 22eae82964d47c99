//! Error types for spatio-frames.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FrameError>;

#[derive(Debug, Error)]
pub enum FrameError {
    /// A placement policy or configuration precondition does not hold.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An encoded frame, index, master file or placement artifact is corrupt.
    #[error("malformed index file: {0}")]
    MalformedIndexFile(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl FrameError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FrameError::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn truncated(what: &str, needed: usize, remaining: usize) -> Self {
        FrameError::MalformedIndexFile(format!(
            "truncated {}: needed {} bytes, {} remaining",
            what, needed, remaining
        ))
    }

    /// True for errors raised by the storage layer.
    pub fn is_io(&self) -> bool {
        matches!(self, FrameError::Storage { .. } | FrameError::Io(_))
    }
}

impl From<serde_json::Error> for FrameError {
    fn from(err: serde_json::Error) -> Self {
        FrameError::Serialization(err.to_string())
    }
}
