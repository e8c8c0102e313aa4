//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;
use topictree::WalkError;

/// CLI errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The namespace file could not be read.
    #[error("failed to read namespace file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The namespace file is not valid JSON.
    #[error("invalid namespace file: {0}")]
    Json(#[from] serde_json::Error),

    /// The walk reported an error.
    #[error("walk failed: {0}")]
    Walk(#[from] WalkError),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;
