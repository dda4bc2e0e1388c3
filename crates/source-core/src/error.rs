//! Error types shared by the kernel.

use crate::handle::HandleId;
use crate::storage::StorageError;
use source_core_lang::LanguageId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Kernel-level errors.
///
/// Every failure that crosses a component boundary is surfaced as one of these values; parsing
/// never produces one (malformed input degrades to a tree with error nodes instead).
pub enum CoreError {
    #[error("content handle {0} has been invalidated")]
    /// The handle (or a provider/tree derived from it) was deleted or superseded.
    ///
    /// Recoverable by re-fetching a fresh reference.
    Invalidated(HandleId),

    #[error("`{}` already exists", .0.display())]
    /// A rename target is already occupied by a distinct sibling.
    NameCollision(PathBuf),

    #[error("unsupported operation: {0}")]
    /// The operation is meaningless for this provider/handle variant.
    Unsupported(&'static str),

    #[error("{operation} failed for `{}`", path.display())]
    /// A storage operation failed. Never retried internally.
    OperationFailed {
        /// Which storage operation failed (`load`, `write`, `rename`, `delete`).
        operation: &'static str,
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying storage failure.
        #[source]
        source: StorageError,
    },

    #[error("edit range {start}..{end} is out of bounds for a document of {len} chars")]
    /// An edit range was inverted or ran past the end of the document.
    InvalidRange {
        /// Range start (char offset).
        start: usize,
        /// Range end (char offset, exclusive).
        end: usize,
        /// Document length in chars.
        len: usize,
    },

    #[error("unknown language `{0}`")]
    /// No parser/config is registered for the language.
    UnknownLanguage(LanguageId),
}

impl CoreError {
    /// Returns `true` for [`CoreError::Invalidated`].
    pub fn is_invalidated(&self) -> bool {
        matches!(self, Self::Invalidated(_))
    }

    pub(crate) fn storage(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: StorageError,
    ) -> Self {
        match source {
            StorageError::NameCollision(path) => Self::NameCollision(path),
            source => Self::OperationFailed {
                operation,
                path: path.into(),
                source,
            },
        }
    }
}

/// Convenience alias used throughout the kernel.
pub type CoreResult<T> = Result<T, CoreError>;
