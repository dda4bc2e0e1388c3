//! Error types.

use source_core::HandleId;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced by persisted stores.
pub enum StoreError {
    #[error("I/O error: {0}")]
    /// Filesystem I/O failed.
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    /// The persisted file could not be (de)serialized.
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
/// Errors produced by the candidate chooser.
pub enum ChooserError {
    #[error("handle {0} was invalidated")]
    /// The reference site or a candidate is backed by a deleted handle.
    Invalidated(HandleId),

    #[error("store error: {0}")]
    /// The statistics or settings store failed.
    Store(#[from] StoreError),

    #[error("no candidates to choose from")]
    /// The candidate set was empty.
    EmptyCandidates,

    #[error("picker chose index {index} out of {len} candidates")]
    /// The picker returned an index outside the ranked list.
    InvalidChoice {
        /// Returned index.
        index: usize,
        /// Number of ranked candidates.
        len: usize,
    },
}
