//! Change notifications.
//!
//! The kernel emits two kinds of notifications to the outside world (highlighters, indexers,
//! UI): a document changed, or a provider was invalidated. Emission is fire-and-forget: the
//! kernel never waits on, or reacts to, delivery.

use crate::handle::{ContentHandle, HandleId};
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;

/// Notification sink.
pub trait Notifier: Send + Sync {
    /// The content of `handle` changed.
    fn document_changed(&self, handle: &ContentHandle);

    /// `handle` was deleted; its provider and trees are no longer usable.
    fn provider_invalidated(&self, handle: &ContentHandle);
}

/// A notifier that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn document_changed(&self, _handle: &ContentHandle) {}

    fn provider_invalidated(&self, _handle: &ContentHandle) {}
}

/// A notification value, as delivered to callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Document content changed.
    DocumentChanged {
        /// Handle id.
        handle: HandleId,
        /// Handle path at emission time.
        path: PathBuf,
    },
    /// Provider invalidated (handle deleted).
    ProviderInvalidated {
        /// Handle id.
        handle: HandleId,
        /// Handle path at emission time.
        path: PathBuf,
    },
}

impl Notification {
    /// The handle the notification is about.
    pub fn handle(&self) -> HandleId {
        match self {
            Self::DocumentChanged { handle, .. } | Self::ProviderInvalidated { handle, .. } => {
                *handle
            }
        }
    }
}

/// Notification callback type.
pub type NotificationCallback = Box<dyn Fn(&Notification) + Send + Sync>;

/// A notifier that forwards every notification to subscribed callbacks.
#[derive(Default)]
pub struct CallbackNotifier {
    callbacks: RwLock<Vec<NotificationCallback>>,
}

impl std::fmt::Debug for CallbackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackNotifier")
            .field("callbacks", &self.callbacks.read().len())
            .finish()
    }
}

impl CallbackNotifier {
    /// Create a notifier without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a callback.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Box::new(callback));
    }

    fn emit(&self, notification: Notification) {
        for callback in self.callbacks.read().iter() {
            callback(&notification);
        }
    }
}

impl Notifier for CallbackNotifier {
    fn document_changed(&self, handle: &ContentHandle) {
        self.emit(Notification::DocumentChanged {
            handle: handle.id(),
            path: handle.path(),
        });
    }

    fn provider_invalidated(&self, handle: &ContentHandle) {
        self.emit(Notification::ProviderInvalidated {
            handle: handle.id(),
            path: handle.path(),
        });
    }
}

/// A notifier that records notifications in memory (useful for tests and instrumentation).
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded notifications.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded notifications.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Notifier for RecordingNotifier {
    fn document_changed(&self, handle: &ContentHandle) {
        self.events.lock().push(Notification::DocumentChanged {
            handle: handle.id(),
            path: handle.path(),
        });
    }

    fn provider_invalidated(&self, handle: &ContentHandle) {
        self.events.lock().push(Notification::ProviderInvalidated {
            handle: handle.id(),
            path: handle.path(),
        });
    }
}
