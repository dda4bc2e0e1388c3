//! Content handles.
//!
//! A [`ContentHandle`] is the storage-agnostic identity of one unit of source: a stable
//! [`HandleId`], a (renamable) path, the current text and the [`Stamp`] of that text.
//! Handles are either *physical* (backed by a [`crate::Storage`] and indexed by path in a
//! [`crate::Workspace`]) or *synthetic* (scratch buffers that live outside every index).
//!
//! Readers always see a consistent `(text, stamp)` pair: the state sits behind a
//! `parking_lot::RwLock`, and edits are applied while holding the write half.

use crate::change::{DocumentChange, TextEdit};
use crate::error::{CoreError, CoreResult};
use crate::stamp::Stamp;
use parking_lot::RwLock;
use ropey::Rope;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identifier of a [`ContentHandle`]. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

impl HandleId {
    pub(crate) fn allocate() -> Self {
        HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An immutable view of a handle's content at one stamp.
///
/// Cloning is cheap (the rope shares structure with the handle's text).
#[derive(Debug, Clone)]
pub struct ContentSnapshot {
    text: Rope,
    stamp: Stamp,
}

impl ContentSnapshot {
    /// The text as a rope.
    pub fn rope(&self) -> &Rope {
        &self.text
    }

    /// Stamp the text belongs to.
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    /// Length in chars.
    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    /// Content as UTF-8 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.text.len_bytes());
        for chunk in self.text.chunks() {
            out.extend_from_slice(chunk.as_bytes());
        }
        out
    }
}

impl fmt::Display for ContentSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.text.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct HandleState {
    path: PathBuf,
    text: Rope,
    stamp: Stamp,
    valid: bool,
}

/// Identity + content of one unit of source.
#[derive(Debug)]
pub struct ContentHandle {
    id: HandleId,
    physical: bool,
    state: RwLock<HandleState>,
}

impl ContentHandle {
    pub(crate) fn physical(path: impl Into<PathBuf>, text: &str) -> Arc<Self> {
        Self::allocate(path.into(), text, true)
    }

    /// Allocate a synthetic (non-physical) handle.
    ///
    /// Synthetic handles are never indexed by path and never touch storage.
    pub fn synthetic(name: impl Into<PathBuf>, text: &str) -> Arc<Self> {
        Self::allocate(name.into(), text, false)
    }

    fn allocate(path: PathBuf, text: &str, physical: bool) -> Arc<Self> {
        let handle = Arc::new(Self {
            id: HandleId::allocate(),
            physical,
            state: RwLock::new(HandleState {
                path,
                text: Rope::from_str(text),
                stamp: Stamp::next(),
                valid: true,
            }),
        });
        tracing::debug!(
            handle = %handle.id,
            physical,
            path = %handle.path().display(),
            "content handle created"
        );
        handle
    }

    /// Stable identity of this handle.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Whether the handle is backed by storage.
    pub fn is_physical(&self) -> bool {
        self.physical
    }

    /// Whether the handle is still usable (i.e. not deleted).
    pub fn is_valid(&self) -> bool {
        self.state.read().valid
    }

    /// Current path (reflects renames).
    pub fn path(&self) -> PathBuf {
        self.state.read().path.clone()
    }

    /// Current file name, if the path has one.
    pub fn name(&self) -> Option<String> {
        self.state
            .read()
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    /// Stamp of the current content.
    pub fn stamp(&self) -> Stamp {
        self.state.read().stamp
    }

    /// Current content and its stamp, read atomically.
    pub fn content(&self) -> CoreResult<ContentSnapshot> {
        let state = self.state.read();
        if !state.valid {
            return Err(CoreError::Invalidated(self.id));
        }
        Ok(ContentSnapshot {
            text: state.text.clone(),
            stamp: state.stamp,
        })
    }

    /// Current content as a `String`.
    pub fn text(&self) -> CoreResult<String> {
        self.content().map(|snapshot| snapshot.to_string())
    }

    pub(crate) fn check_valid(&self) -> CoreResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CoreError::Invalidated(self.id))
        }
    }

    pub(crate) fn set_path(&self, path: &Path) {
        self.state.write().path = path.to_path_buf();
    }

    /// Mark the handle permanently invalid. Returns `false` if it already was.
    pub(crate) fn invalidate(&self) -> bool {
        let mut state = self.state.write();
        std::mem::replace(&mut state.valid, false)
    }

    /// Replace `range` (char offsets) with `replacement` and bump the stamp.
    ///
    /// The whole replacement happens under the write lock, so readers observe either the
    /// pre-edit or the post-edit snapshot.
    pub(crate) fn apply_edit(
        &self,
        range: Range<usize>,
        replacement: &str,
    ) -> CoreResult<DocumentChange> {
        let mut state = self.state.write();
        if !state.valid {
            return Err(CoreError::Invalidated(self.id));
        }

        let len = state.text.len_chars();
        if range.start > range.end || range.end > len {
            return Err(CoreError::InvalidRange {
                start: range.start,
                end: range.end,
                len,
            });
        }

        let deleted_text = state.text.slice(range.clone()).to_string();
        state.text.remove(range.clone());
        state.text.insert(range.start, replacement);

        let old_stamp = state.stamp;
        state.stamp = Stamp::next();

        Ok(DocumentChange {
            handle: self.id,
            old_stamp,
            new_stamp: state.stamp,
            before_char_count: len,
            after_char_count: state.text.len_chars(),
            edit: TextEdit {
                start: range.start,
                deleted_text,
                inserted_text: replacement.to_string(),
            },
        })
    }

    /// Replace the whole text without producing a change record.
    pub(crate) fn replace_text(&self, text: &str) -> CoreResult<Stamp> {
        let mut state = self.state.write();
        if !state.valid {
            return Err(CoreError::Invalidated(self.id));
        }
        state.text = Rope::from_str(text);
        state.stamp = Stamp::next();
        Ok(state.stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct() {
        let a = ContentHandle::synthetic("a", "");
        let b = ContentHandle::synthetic("a", "");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_apply_edit_bumps_stamp_and_records_delta() {
        let handle = ContentHandle::physical("/p/a.txt", "hello world");
        let before = handle.stamp();
        let change = handle.apply_edit(6..11, "there").unwrap();

        assert_eq!(handle.text().unwrap(), "hello there");
        assert_eq!(change.old_stamp, before);
        assert!(change.new_stamp > before);
        assert_eq!(handle.stamp(), change.new_stamp);
        assert_eq!(change.edit.deleted_text, "world");
        assert_eq!(change.edit.inserted_text, "there");
        assert_eq!(change.before_char_count, 11);
        assert_eq!(change.after_char_count, 11);
    }

    #[test]
    fn test_apply_edit_uses_char_offsets() {
        let handle = ContentHandle::synthetic("u", "héllo");
        handle.apply_edit(1..2, "e").unwrap();
        assert_eq!(handle.text().unwrap(), "hello");
    }

    #[test]
    fn test_apply_edit_rejects_bad_ranges() {
        let handle = ContentHandle::synthetic("r", "abc");
        let stamp = handle.stamp();
        assert!(matches!(
            handle.apply_edit(2..5, "x"),
            Err(CoreError::InvalidRange { len: 3, .. })
        ));
        #[allow(clippy::reversed_empty_ranges)]
        let inverted = 2..1;
        assert!(handle.apply_edit(inverted, "x").is_err());
        assert_eq!(handle.stamp(), stamp);
        assert_eq!(handle.text().unwrap(), "abc");
    }

    #[test]
    fn test_invalidate_is_idempotent_and_blocks_content() {
        let handle = ContentHandle::physical("/p/b.txt", "x");
        assert!(handle.invalidate());
        assert!(!handle.invalidate());
        assert!(matches!(handle.content(), Err(CoreError::Invalidated(id)) if id == handle.id()));
        assert!(handle.apply_edit(0..0, "y").is_err());
    }

    #[test]
    fn test_snapshot_bytes_round_trip_text() {
        let handle = ContentHandle::synthetic("s", "fn main() {}\n");
        let snapshot = handle.content().unwrap();
        assert_eq!(snapshot.to_bytes(), b"fn main() {}\n".to_vec());
        assert_eq!(snapshot.stamp(), handle.stamp());
    }
}
