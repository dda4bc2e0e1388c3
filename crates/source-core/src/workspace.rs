//! Workspace: the path-facing side of the kernel.
//!
//! A [`Workspace`] owns the path index of physical handles and wires the collaborators
//! together:
//!
//! - a [`Storage`] to load, save, rename and delete content
//! - a [`LanguageRegistry`] to decide which languages a path has and how to parse them
//! - a [`ProviderRegistry`] holding at most one [`ViewProvider`] per physical handle
//! - a [`Notifier`] for document/provider events
//!
//! Handles are created on first path resolution and keep their identity for their whole life:
//! renaming moves the handle in the index, deleting invalidates it together with its document,
//! provider and trees.

use crate::document::Document;
use crate::error::{CoreError, CoreResult};
use crate::handle::{ContentHandle, HandleId};
use crate::language::LanguageRegistry;
use crate::notify::{Notifier, NullNotifier};
use crate::provider::ViewProvider;
use crate::registry::ProviderRegistry;
use crate::stamp::Stamp;
use crate::storage::Storage;
use crate::tree::StructuralTree;
use parking_lot::{Mutex, RwLock};
use source_core_lang::LanguageId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Default)]
struct HandleIndex {
    by_path: HashMap<PathBuf, HandleId>,
    handles: HashMap<HandleId, Arc<ContentHandle>>,
}

/// Outcome of resolving one path in a batch.
#[derive(Debug)]
pub struct Resolved<T> {
    /// The requested path.
    pub path: PathBuf,
    /// Per-item result.
    pub outcome: CoreResult<T>,
}

/// Path index + collaborators for physical content.
pub struct Workspace {
    storage: Arc<dyn Storage>,
    languages: Arc<LanguageRegistry>,
    registry: Arc<ProviderRegistry>,
    notifier: Arc<dyn Notifier>,
    index: RwLock<HandleIndex>,
    documents: Mutex<HashMap<HandleId, Arc<Document>>>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("handles", &self.len())
            .field("providers", &self.registry.len())
            .field("languages", &self.languages)
            .finish()
    }
}

impl Workspace {
    /// Create a workspace over `storage`, parsing with `languages` and registering providers in
    /// `registry`.
    pub fn new(
        storage: Arc<dyn Storage>,
        languages: Arc<LanguageRegistry>,
        registry: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            storage,
            languages,
            registry,
            notifier: Arc::new(NullNotifier),
            index: RwLock::new(HandleIndex::default()),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Use `notifier` for document/provider events.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The storage collaborator.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// The language registry.
    pub fn languages(&self) -> &Arc<LanguageRegistry> {
        &self.languages
    }

    /// The provider registry.
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// The notifier.
    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Number of live physical handles.
    pub fn len(&self) -> usize {
        self.index.read().handles.len()
    }

    /// Returns `true` if no handle is live.
    pub fn is_empty(&self) -> bool {
        self.index.read().handles.is_empty()
    }

    /// Handle currently indexed at `path`, without touching storage.
    pub fn find(&self, path: &Path) -> Option<Arc<ContentHandle>> {
        let index = self.index.read();
        let id = index.by_path.get(path)?;
        index.handles.get(id).cloned()
    }

    /// Live handle by id.
    pub fn handle(&self, id: HandleId) -> Option<Arc<ContentHandle>> {
        self.index.read().handles.get(&id).cloned()
    }

    /// Handle for `path`, loading it from storage on first resolution.
    ///
    /// Concurrent first resolutions of the same path converge on one handle.
    pub fn resolve(&self, path: impl AsRef<Path>) -> CoreResult<Arc<ContentHandle>> {
        let path = path.as_ref();
        if let Some(handle) = self.find(path) {
            return Ok(handle);
        }

        let text = self.storage.load(path).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "failed to load content");
            CoreError::storage("load", path, source)
        })?;

        let mut index = self.index.write();
        if let Some(existing) = index
            .by_path
            .get(path)
            .and_then(|id| index.handles.get(id))
        {
            return Ok(existing.clone());
        }
        let handle = ContentHandle::physical(path, &text);
        index.by_path.insert(path.to_path_buf(), handle.id());
        index.handles.insert(handle.id(), handle.clone());
        Ok(handle)
    }

    /// Resolve many paths, reporting one outcome per path (in input order).
    pub fn resolve_all<I, P>(&self, paths: I) -> Vec<Resolved<Arc<ContentHandle>>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .map(|path| {
                let path = path.as_ref();
                Resolved {
                    path: path.to_path_buf(),
                    outcome: self.resolve(path),
                }
            })
            .collect()
    }

    /// The document bound to `handle`, created on first use.
    pub fn document(&self, handle: &Arc<ContentHandle>) -> CoreResult<Arc<Document>> {
        handle.check_valid()?;
        self.check_indexed(handle)?;

        let mut documents = self.documents.lock();
        let document = documents.entry(handle.id()).or_insert_with(|| {
            Arc::new(Document::new(
                handle.clone(),
                self.registry.clone(),
                self.notifier.clone(),
            ))
        });
        Ok(document.clone())
    }

    /// The provider of `handle`, created and registered on first use.
    pub fn provider(&self, handle: &Arc<ContentHandle>) -> CoreResult<Arc<ViewProvider>> {
        self.check_indexed(handle)?;
        self.registry.get_or_create(handle, || {
            ViewProvider::physical(handle.clone(), self.languages.clone())
        })
    }

    /// Tree of `handle` for `language`. `Ok(None)` if the language is not relevant.
    pub fn tree(
        &self,
        handle: &Arc<ContentHandle>,
        language: &LanguageId,
    ) -> CoreResult<Option<Arc<StructuralTree>>> {
        self.provider(handle)?.get_tree(language)
    }

    /// Tree of `handle` for its base language.
    pub fn base_tree(
        &self,
        handle: &Arc<ContentHandle>,
    ) -> CoreResult<Option<Arc<StructuralTree>>> {
        let provider = self.provider(handle)?;
        match provider.base_language() {
            Some(language) => provider.get_tree(language),
            None => Ok(None),
        }
    }

    /// Write the current content of `handle` to storage. Returns the saved stamp.
    pub fn save(&self, handle: &Arc<ContentHandle>) -> CoreResult<Stamp> {
        let snapshot = handle.content()?;
        let path = handle.path();
        self.storage
            .write(&path, &snapshot.to_string())
            .map_err(|source| {
                tracing::warn!(path = %path.display(), error = %source, "failed to save content");
                CoreError::storage("write", &path, source)
            })?;
        if let Some(document) = self.documents.lock().get(&handle.id()) {
            document.mark_saved(snapshot.stamp());
        }
        tracing::debug!(handle = %handle.id(), stamp = %snapshot.stamp(), "content saved");
        Ok(snapshot.stamp())
    }

    /// Check that `handle` may be renamed to `new_name` and return the resulting path.
    ///
    /// Fails with [`CoreError::NameCollision`] if a distinct sibling already occupies the name.
    pub fn check_rename(&self, handle: &ContentHandle, new_name: &str) -> CoreResult<PathBuf> {
        handle.check_valid()?;
        let component = !matches!(new_name, "" | "." | "..") && !new_name.contains(['/', '\\']);
        if !component {
            return Err(CoreError::Unsupported("names must be a single path component"));
        }

        let current = handle.path();
        let target = match current.parent() {
            Some(parent) => parent.join(new_name),
            None => PathBuf::from(new_name),
        };
        if target == current || !handle.is_physical() {
            return Ok(target);
        }

        let indexed = self.index.read().by_path.get(&target).copied();
        let occupied = match indexed {
            Some(id) => id != handle.id(),
            None => self.storage.exists(&target),
        };
        if occupied {
            return Err(CoreError::NameCollision(target));
        }
        Ok(target)
    }

    /// Rename `handle` within its parent directory.
    ///
    /// Identity and stamp are unchanged; only the path moves. Synthetic handles are renamed in
    /// place without touching storage.
    pub fn rename(&self, handle: &Arc<ContentHandle>, new_name: &str) -> CoreResult<()> {
        let target = self.check_rename(handle, new_name)?;
        let current = handle.path();
        if target == current {
            return Ok(());
        }
        if !handle.is_physical() {
            handle.set_path(&target);
            return Ok(());
        }

        self.storage.rename(&current, &target).map_err(|source| {
            tracing::warn!(
                from = %current.display(),
                to = %target.display(),
                error = %source,
                "failed to rename content"
            );
            CoreError::storage("rename", &current, source)
        })?;

        {
            let mut index = self.index.write();
            index.by_path.remove(&current);
            index.by_path.insert(target.clone(), handle.id());
            handle.set_path(&target);
        }
        // A rename that changes the language set retires the provider; the next request
        // builds one for the new path.
        if let Some(provider) = self.registry.get(handle.id())
            && provider.languages() != self.languages.languages_for_path(&target).as_slice()
        {
            self.registry.evict(handle.id());
            self.notifier.provider_invalidated(handle);
        }
        tracing::debug!(
            handle = %handle.id(),
            from = %current.display(),
            to = %target.display(),
            "content renamed"
        );
        Ok(())
    }

    /// Delete `handle` from storage and invalidate everything derived from it.
    ///
    /// Deleting an already deleted handle is a no-op. On storage failure the handle is left
    /// untouched and [`CoreError::OperationFailed`] is returned.
    pub fn delete(&self, handle: &Arc<ContentHandle>) -> CoreResult<()> {
        if !handle.is_valid() {
            return Ok(());
        }
        if !handle.is_physical() {
            return Err(CoreError::Unsupported("deleting a synthetic handle"));
        }

        let path = handle.path();
        self.storage.delete(&path).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "failed to delete content");
            CoreError::storage("delete", &path, source)
        })?;
        self.invalidate(handle);
        Ok(())
    }

    /// Invalidate `handle` without touching storage (e.g. after an external delete).
    pub fn invalidate(&self, handle: &Arc<ContentHandle>) {
        if !handle.invalidate() {
            return;
        }
        {
            let mut index = self.index.write();
            index.handles.remove(&handle.id());
            index.by_path.retain(|_, id| *id != handle.id());
        }
        self.documents.lock().remove(&handle.id());
        self.registry.evict(handle.id());
        self.notifier.provider_invalidated(handle);
        tracing::debug!(
            handle = %handle.id(),
            path = %handle.path().display(),
            "content invalidated"
        );
    }

    /// Tear the workspace down: every handle is dropped from the index and the provider
    /// registry is disposed.
    pub fn dispose(&self) {
        let handles: Vec<_> = {
            let mut index = self.index.write();
            index.by_path.clear();
            index.handles.drain().map(|(_, h)| h).collect()
        };
        self.documents.lock().clear();
        self.registry.dispose();
        tracing::debug!(handles = handles.len(), "workspace disposed");
    }

    fn check_indexed(&self, handle: &ContentHandle) -> CoreResult<()> {
        if !handle.is_physical() {
            return Err(CoreError::Unsupported(
                "synthetic handles are not managed by a workspace",
            ));
        }
        if self.index.read().handles.contains_key(&handle.id()) {
            Ok(())
        } else {
            Err(CoreError::Invalidated(handle.id()))
        }
    }
}
