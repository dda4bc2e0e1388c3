//! Structured document change records.
//!
//! Every applied [`crate::Document::edit`] produces a [`DocumentChange`]: the stamps before and
//! after the edit plus a [`TextEdit`] expressed in **character offsets** (Unicode scalar
//! values), so listeners can follow the text without diffing old/new snapshots.

use crate::handle::HandleId;
use crate::stamp::Stamp;

/// A single text replacement expressed in character offsets.
///
/// - `start` is a character offset in the document **before** the edit.
/// - The deleted range is defined by the length (in `char`s) of `deleted_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// Start character offset of the edit.
    pub start: usize,
    /// Exact deleted text (may be empty).
    pub deleted_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl TextEdit {
    /// Length of `deleted_text` in characters.
    pub fn deleted_len(&self) -> usize {
        self.deleted_text.chars().count()
    }

    /// Length of `inserted_text` in characters.
    pub fn inserted_len(&self) -> usize {
        self.inserted_text.chars().count()
    }

    /// Exclusive end character offset in the pre-edit document.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.deleted_len())
    }

    /// Returns `true` if the edit neither deletes nor inserts anything.
    pub fn is_empty(&self) -> bool {
        self.deleted_text.is_empty() && self.inserted_text.is_empty()
    }
}

/// Record of one applied document edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    /// Handle whose content changed.
    pub handle: HandleId,
    /// Stamp of the content before the edit.
    pub old_stamp: Stamp,
    /// Stamp of the content after the edit (always greater than `old_stamp`).
    pub new_stamp: Stamp,
    /// Character count before the edit.
    pub before_char_count: usize,
    /// Character count after the edit.
    pub after_char_count: usize,
    /// The replacement that was applied.
    pub edit: TextEdit,
}
