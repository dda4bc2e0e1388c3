//! Document model.
//!
//! A [`Document`] is the editing surface of one [`ContentHandle`]. Every edit is applied
//! atomically to the handle (readers never observe a half-applied edit), strictly bumps the
//! handle's stamp, and is then announced:
//!
//! 1. to the handle's registered [`crate::ViewProvider`] via `contents_changed()` (which does
//!    no eager work; trees are rebuilt lazily on the next request),
//! 2. to the process-wide [`Notifier`] when the provider's event system is enabled,
//! 3. to the document's own listeners, with a structured [`DocumentChange`].
//!
//! # Example
//!
//! ```rust
//! use source_core::{ContentHandle, Document, NullNotifier, ProviderRegistry};
//! use std::sync::Arc;
//!
//! let handle = ContentHandle::synthetic("scratch.txt", "hello");
//! let doc = Document::new(handle.clone(), Arc::new(ProviderRegistry::new()), Arc::new(NullNotifier));
//!
//! let before = handle.stamp();
//! let change = doc.edit(5..5, ", world").unwrap();
//! assert_eq!(doc.text().unwrap(), "hello, world");
//! assert!(change.new_stamp > before);
//! ```

use crate::change::DocumentChange;
use crate::error::CoreResult;
use crate::handle::ContentHandle;
use crate::notify::Notifier;
use crate::registry::ProviderRegistry;
use crate::stamp::Stamp;
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::Arc;

/// Document listener type.
pub type DocumentListener = Box<dyn FnMut(&DocumentChange) + Send>;

/// Mutable text bound 1:1 to a content handle.
pub struct Document {
    handle: Arc<ContentHandle>,
    registry: Arc<ProviderRegistry>,
    notifier: Arc<dyn Notifier>,
    listeners: Mutex<Vec<DocumentListener>>,
    saved_stamp: Mutex<Stamp>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("handle", &self.handle.id())
            .field("stamp", &self.handle.stamp())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl Document {
    /// Bind a document to `handle`.
    ///
    /// `registry` is consulted on every edit to find the handle's provider; `notifier`
    /// receives `document_changed` events.
    pub fn new(
        handle: Arc<ContentHandle>,
        registry: Arc<ProviderRegistry>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let saved_stamp = Mutex::new(handle.stamp());
        Self {
            handle,
            registry,
            notifier,
            listeners: Mutex::new(Vec::new()),
            saved_stamp,
        }
    }

    /// The bound handle.
    pub fn handle(&self) -> &Arc<ContentHandle> {
        &self.handle
    }

    /// Stamp of the current text (mirrors the handle's stamp).
    pub fn stamp(&self) -> Stamp {
        self.handle.stamp()
    }

    /// Current text.
    pub fn text(&self) -> CoreResult<String> {
        self.handle.text()
    }

    /// Length in chars.
    pub fn len_chars(&self) -> CoreResult<usize> {
        Ok(self.handle.content()?.len_chars())
    }

    /// Replace `range` (char offsets, half-open) with `replacement`.
    ///
    /// Fails with [`crate::CoreError::InvalidRange`] for an inverted or out-of-bounds range and
    /// with [`crate::CoreError::Invalidated`] after the handle was deleted. On failure nothing
    /// changes and nobody is notified.
    pub fn edit(&self, range: Range<usize>, replacement: &str) -> CoreResult<DocumentChange> {
        let change = self.handle.apply_edit(range, replacement)?;
        tracing::trace!(
            handle = %self.handle.id(),
            old = %change.old_stamp,
            new = %change.new_stamp,
            "document edited"
        );
        self.announce(&change);
        Ok(change)
    }

    /// Insert `text` at char `offset`.
    pub fn insert(&self, offset: usize, text: &str) -> CoreResult<DocumentChange> {
        self.edit(offset..offset, text)
    }

    /// Delete the chars in `range`.
    pub fn delete(&self, range: Range<usize>) -> CoreResult<DocumentChange> {
        self.edit(range, "")
    }

    /// Replace the whole text.
    pub fn set_text(&self, text: &str) -> CoreResult<DocumentChange> {
        let len = self.len_chars()?;
        self.edit(0..len, text)
    }

    /// Subscribe to applied edits.
    ///
    /// Listeners run synchronously after the edit is visible; they must not edit this document.
    /// A listener added from inside a listener first sees the next edit.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: FnMut(&DocumentChange) + Send + 'static,
    {
        self.listeners.lock().push(Box::new(listener));
    }

    /// Whether the text changed since it was loaded or last saved.
    pub fn is_modified(&self) -> bool {
        *self.saved_stamp.lock() != self.handle.stamp()
    }

    pub(crate) fn mark_saved(&self, stamp: Stamp) {
        *self.saved_stamp.lock() = stamp;
    }

    fn announce(&self, change: &DocumentChange) {
        let events_enabled = match self.registry.get(self.handle.id()) {
            Some(provider) => {
                provider.contents_changed();
                provider.is_event_system_enabled()
            }
            None => self.handle.is_physical(),
        };
        if events_enabled {
            self.notifier.document_changed(&self.handle);
        }

        // Dispatch outside the lock so listeners may subscribe.
        let mut listeners = std::mem::take(&mut *self.listeners.lock());
        for listener in listeners.iter_mut() {
            listener(change);
        }
        let mut slot = self.listeners.lock();
        listeners.append(&mut slot);
        *slot = listeners;
    }
}
