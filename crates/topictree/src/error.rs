//! Walker error types.

use thiserror::Error;

/// Errors reported by a notification source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Registering a listener failed.
    #[error("registration failed: {0}")]
    Registration(String),

    /// A select or deselect request was rejected.
    #[error("selection of '{path}' failed: {message}")]
    Selection { path: String, message: String },

    /// The registration has already been closed.
    #[error("registration closed")]
    Closed,
}

/// Walker errors.
#[derive(Debug, Clone, Error)]
pub enum WalkError {
    /// The walk could not register with its source.
    #[error("registration error: {0}")]
    Registration(#[source] SourceError),

    /// A fire-and-forget select/deselect issued by the walk failed.
    #[error("selection error for '{path}': {source}")]
    Selection {
        path: String,
        #[source]
        source: SourceError,
    },

    /// The walk has closed.
    #[error("walk closed")]
    Closed,
}
