#![warn(missing_docs)]
//! Source Core - Headless Source Content Kernel
//!
//! # Overview
//!
//! `source-core` binds units of source content to lazily parsed structural trees. It keeps
//! parsed trees consistent with edits without reparsing eagerly, lets scratch (transient)
//! content be parsed without touching storage, and keeps content identity stable across
//! rename and delete.
//!
//! # Core Features
//!
//! - **Stamp-Based Invalidation**: every content change draws a fresh [`Stamp`] from one
//!   monotonic counter; cached trees are compared against it on the next request
//! - **Lazy Trees**: [`ViewProvider::get_tree`] parses on demand, outside every lock, and only
//!   publishes results whose stamp is still current
//! - **Composite Content**: one provider holds one tree per relevant language
//! - **Transient Providers**: scratch parsing over synthetic handles, never reachable by path
//! - **Stable Identity**: renames keep the [`ContentHandle`]; deletes invalidate it together
//!   with its document, provider and trees
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Workspace + Identity Manager               │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Provider Registry                          │  ← Handle → Provider
//! ├─────────────────────────────────────────────┤
//! │  View Providers (physical / transient)      │  ← Tree Cache
//! ├─────────────────────────────────────────────┤
//! │  Structural Trees + Language Registry       │  ← Parsing
//! ├─────────────────────────────────────────────┤
//! │  Document Model                             │  ← Edits + Notifications
//! ├─────────────────────────────────────────────┤
//! │  Content Handles + Stamps                   │  ← Identity + Text
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use source_core::{
//!     LanguageConfig, LanguageId, LanguageRegistry, MemoryStorage, ProviderRegistry,
//!     SyntaxNode, Workspace,
//! };
//! use std::sync::Arc;
//!
//! let languages = LanguageRegistry::new().with_language(
//!     LanguageConfig::new("plain").with_extension("txt"),
//!     |source: &str| SyntaxNode::new("file", 0..source.len()),
//! );
//! let storage = MemoryStorage::new().with_file("/project/a.txt", "hello");
//! let workspace = Workspace::new(
//!     Arc::new(storage),
//!     Arc::new(languages),
//!     Arc::new(ProviderRegistry::new()),
//! );
//!
//! let plain = LanguageId::new("plain");
//! let handle = workspace.resolve("/project/a.txt").unwrap();
//! let tree = workspace.tree(&handle, &plain).unwrap().unwrap();
//! assert_eq!(tree.source(), "hello");
//!
//! // Edits only bump the stamp; the next request reparses.
//! workspace.document(&handle).unwrap().insert(5, ", world").unwrap();
//! assert!(tree.is_stale());
//! let fresh = workspace.tree(&handle, &plain).unwrap().unwrap();
//! assert_eq!(fresh.source(), "hello, world");
//! ```
//!
//! # Module Description
//!
//! - [`stamp`] - monotonic modification stamps
//! - [`handle`] - content handles (identity, path, text, stamp)
//! - [`change`] - structured edit records
//! - [`document`] - document model (edits, listeners, notifications)
//! - [`tree`] - syntax nodes and structural trees
//! - [`language`] - parser trait and language registry
//! - [`provider`] - view providers and their tree cache
//! - [`registry`] - handle → provider registry
//! - [`storage`] - storage trait and implementations
//! - [`notify`] - notification sinks
//! - [`workspace`] - path index and lifecycle (resolve, save, rename, delete)
//! - [`identity`] - tree-level rename/delete and batch lookup
//!
//! # Logging
//!
//! The crate logs through `tracing` and never installs a subscriber.

pub mod change;
pub mod document;
pub mod error;
pub mod handle;
pub mod identity;
pub mod language;
pub mod notify;
pub mod provider;
pub mod registry;
pub mod stamp;
pub mod storage;
pub mod tree;
pub mod workspace;

pub use change::{DocumentChange, TextEdit};
pub use document::{Document, DocumentListener};
pub use error::{CoreError, CoreResult};
pub use handle::{ContentHandle, ContentSnapshot, HandleId};
pub use identity::{IdentityManager, TreeLookup};
pub use language::{LanguageRegistry, Parser};
pub use notify::{
    CallbackNotifier, Notification, NotificationCallback, Notifier, NullNotifier,
    RecordingNotifier,
};
pub use provider::{ProviderKind, ViewProvider};
pub use registry::ProviderRegistry;
pub use source_core_lang::{LanguageConfig, LanguageId};
pub use stamp::Stamp;
pub use storage::{FsStorage, MemoryStorage, Storage, StorageError, StorageOp};
pub use tree::{ERROR_KIND, StructuralTree, SyntaxNode};
pub use workspace::{Resolved, Workspace};
