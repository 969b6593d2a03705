use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown prompt template: {0}")]
    UnknownTemplate(String),

    #[error("request failed: {0}")]
    TransientRequest(String),

    /// Every attempt of one request failed. Terminal for the current run only.
    #[error("retry budget exhausted after {attempts} attempt(s)")]
    RetryBudgetExhausted {
        attempts: u32,
        #[source]
        last: Box<BatchError>,
    },

    #[error("post-processing failed: {0}")]
    PostProcess(String),

    #[error("io error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = BatchError> = std::result::Result<T, E>;
