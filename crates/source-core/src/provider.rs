//! View providers.
//!
//! A [`ViewProvider`] owns the parsed trees of exactly one [`ContentHandle`], one per relevant
//! language (several for composite files that embed other languages). Trees are built lazily
//! on [`ViewProvider::get_tree`] and cached together with the stamp they were built at; an edit
//! only bumps the handle's stamp, and the mismatch is noticed on the next request.
//!
//! Providers come in two variants, selected by [`ProviderKind`]:
//!
//! - **Physical**: backed by a physical handle, registered in the [`crate::ProviderRegistry`],
//!   content read from the handle (edited through a [`crate::Document`]).
//! - **Transient**: backed by a synthetic handle, held only by its creator, content sourced
//!   from its own base tree's text. Used for scratch parsing.
//!
//! # Publication rule
//!
//! A parse captures the stamp of the content it read. Its result is cached only if that stamp
//! still equals the provider's stamp when the cache lock is taken; otherwise it is dropped and
//! the request retried against fresh content. If another caller already published a tree at
//! the same stamp, that tree is returned instead, so concurrent first requests converge on one
//! instance.

use crate::error::{CoreError, CoreResult};
use crate::handle::ContentHandle;
use crate::language::LanguageRegistry;
use crate::stamp::Stamp;
use crate::tree::{StructuralTree, SyntaxNode};
use parking_lot::RwLock;
use source_core_lang::LanguageId;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// The provider variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Backed by storage; registered per handle.
    Physical,
    /// Scratch provider over a synthetic handle.
    Transient,
}

/// Owner of the parsed trees of one handle.
pub struct ViewProvider {
    this: Weak<ViewProvider>,
    kind: ProviderKind,
    handle: Arc<ContentHandle>,
    languages: Vec<LanguageId>,
    parsers: Arc<LanguageRegistry>,
    own_stamp: AtomicU64,
    trees: RwLock<HashMap<LanguageId, Arc<StructuralTree>>>,
    valid: AtomicBool,
}

impl std::fmt::Debug for ViewProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewProvider")
            .field("kind", &self.kind)
            .field("handle", &self.handle.id())
            .field("languages", &self.languages)
            .field("stamp", &self.stamp())
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl ViewProvider {
    /// Create a physical provider for `handle`.
    ///
    /// Relevant languages are derived from the handle's path. Most callers go through
    /// [`crate::Workspace::provider`], which also registers the provider.
    pub fn physical(
        handle: Arc<ContentHandle>,
        parsers: Arc<LanguageRegistry>,
    ) -> CoreResult<Arc<Self>> {
        if !handle.is_physical() {
            return Err(CoreError::Unsupported(
                "physical view provider over a synthetic handle",
            ));
        }
        handle.check_valid()?;

        let languages = parsers.languages_for_path(&handle.path());
        tracing::debug!(
            handle = %handle.id(),
            languages = ?languages,
            "physical view provider created"
        );
        Ok(Arc::new_cyclic(|this| Self {
            this: this.clone(),
            kind: ProviderKind::Physical,
            handle,
            languages,
            parsers,
            own_stamp: AtomicU64::new(Stamp::ZERO.get()),
            trees: RwLock::new(HashMap::new()),
            valid: AtomicBool::new(true),
        }))
    }

    /// Create a transient provider that parses `text` as `language`.
    ///
    /// The provider allocates its own synthetic handle, is never discoverable by path and is
    /// dropped as soon as its last strong reference goes away.
    pub fn transient(
        parsers: Arc<LanguageRegistry>,
        language: LanguageId,
        text: &str,
    ) -> CoreResult<Arc<Self>> {
        let parser = parsers.parser(&language)?;
        let handle = ContentHandle::synthetic(transient_name(&language), text);
        let stamp = Stamp::next();
        let source: Arc<str> = Arc::from(text);
        let root = parser.parse(&source);

        tracing::debug!(handle = %handle.id(), %language, "transient view provider created");
        Ok(Arc::new_cyclic(|this: &Weak<Self>| {
            let holder = StructuralTree::new(
                root,
                language.clone(),
                source,
                stamp,
                handle.id(),
                this.clone(),
            );
            let mut trees = HashMap::new();
            trees.insert(language.clone(), Arc::new(holder));
            Self {
                this: this.clone(),
                kind: ProviderKind::Transient,
                handle,
                languages: vec![language],
                parsers,
                own_stamp: AtomicU64::new(stamp.get()),
                trees: RwLock::new(trees),
                valid: AtomicBool::new(true),
            }
        }))
    }

    /// Provider variant.
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Whether this provider is backed by storage.
    pub fn is_physical(&self) -> bool {
        self.kind == ProviderKind::Physical
    }

    /// Whether edits of this provider's content emit process-wide change notifications.
    pub fn is_event_system_enabled(&self) -> bool {
        self.kind == ProviderKind::Physical
    }

    /// The handle this provider is bound to.
    pub fn handle(&self) -> &Arc<ContentHandle> {
        &self.handle
    }

    /// Relevant languages: the base language first, then embedded languages.
    pub fn languages(&self) -> &[LanguageId] {
        &self.languages
    }

    /// Base language, if any language claims the handle.
    pub fn base_language(&self) -> Option<&LanguageId> {
        self.languages.first()
    }

    /// Returns `true` if `language` is one of the relevant languages.
    pub fn supports(&self, language: &LanguageId) -> bool {
        self.languages.contains(language)
    }

    /// Whether the provider (and its handle) is still usable.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire) && self.handle.is_valid()
    }

    pub(crate) fn check_valid(&self) -> CoreResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CoreError::Invalidated(self.handle.id()))
        }
    }

    /// Current stamp. Cached trees built at any other stamp are stale.
    ///
    /// Physical providers combine the handle's content stamp with their own stamp (bumped by
    /// [`ViewProvider::root_changed`]); both come from the same monotonic counter, so the
    /// larger one is the latest change.
    pub fn stamp(&self) -> Stamp {
        let own = Stamp::from_raw(self.own_stamp.load(Ordering::Acquire));
        match self.kind {
            ProviderKind::Physical => own.max(self.handle.stamp()),
            ProviderKind::Transient => own,
        }
    }

    /// Current content of the provider.
    ///
    /// Transient providers answer with their base tree's text.
    pub fn contents(&self) -> CoreResult<String> {
        self.snapshot().map(|(text, _)| text.to_string())
    }

    /// Tree for `language`, parsed on demand.
    ///
    /// Returns `Ok(None)` if `language` is not relevant for this provider, and
    /// [`CoreError::Invalidated`] once the handle was deleted.
    pub fn get_tree(&self, language: &LanguageId) -> CoreResult<Option<Arc<StructuralTree>>> {
        self.check_valid()?;
        if !self.supports(language) {
            return Ok(None);
        }

        loop {
            let wanted = self.stamp();
            if let Some(tree) = self.trees.read().get(language)
                && tree.built_at() == wanted
            {
                tracing::trace!(handle = %self.handle.id(), %language, "tree cache hit");
                return Ok(Some(tree.clone()));
            }

            let (source, stamp) = self.snapshot()?;
            let parser = self.parsers.parser(language)?;
            let root = parser.parse(&source);
            let tree = Arc::new(StructuralTree::new(
                root,
                language.clone(),
                source,
                stamp,
                self.handle.id(),
                self.this.clone(),
            ));

            if let Some(published) = self.publish(tree, stamp)? {
                return Ok(Some(published));
            }
        }
    }

    /// Trees for every relevant language, in [`ViewProvider::languages`] order.
    pub fn all_trees(&self) -> CoreResult<Vec<Arc<StructuralTree>>> {
        let mut out = Vec::with_capacity(self.languages.len());
        for language in &self.languages {
            if let Some(tree) = self.get_tree(language)? {
                out.push(tree);
            }
        }
        Ok(out)
    }

    /// Cached tree for `language` without parsing. May be stale.
    pub fn cached_tree(&self, language: &LanguageId) -> Option<Arc<StructuralTree>> {
        self.trees.read().get(language).cloned()
    }

    /// Notification that the handle's content changed.
    ///
    /// Does no work: cached trees are detected as stale by stamp on the next
    /// [`ViewProvider::get_tree`].
    pub fn contents_changed(&self) {
        tracing::trace!(handle = %self.handle.id(), "contents changed");
    }

    /// Notification that the tree of `language` was replaced externally by `root`.
    ///
    /// Bumps the provider's own stamp and publishes `root` over the current content as the
    /// tree of `language`. Cached trees of every other language become stale and are rebuilt
    /// on the next request.
    pub fn root_changed(
        &self,
        root: SyntaxNode,
        language: &LanguageId,
    ) -> CoreResult<Arc<StructuralTree>> {
        if !self.supports(language) {
            return Err(CoreError::UnknownLanguage(language.clone()));
        }

        let mut trees = self.trees.write();
        self.check_valid()?;
        let stamp = Stamp::next();
        self.own_stamp.fetch_max(stamp.get(), Ordering::AcqRel);
        // Read content after the bump: a concurrent edit then either shows up here or
        // carries a newer stamp that leaves this tree stale.
        let source = match self.kind {
            ProviderKind::Physical => Arc::from(self.handle.content()?.to_string()),
            ProviderKind::Transient => self.holder_text(&trees),
        };
        let tree = Arc::new(StructuralTree::new(
            root,
            language.clone(),
            source,
            stamp,
            self.handle.id(),
            self.this.clone(),
        ));
        trees.insert(language.clone(), tree.clone());
        tracing::debug!(handle = %self.handle.id(), %language, %stamp, "root changed");
        Ok(tree)
    }

    /// Replace the content of a transient provider, reparsing its base tree.
    ///
    /// Physical providers are edited through their [`crate::Document`] instead.
    pub fn replace_contents(&self, text: &str) -> CoreResult<Arc<StructuralTree>> {
        if self.is_physical() {
            return Err(CoreError::Unsupported(
                "replacing the contents of a physical view provider",
            ));
        }
        let Some(language) = self.base_language().cloned() else {
            return Err(CoreError::Unsupported("transient provider without a language"));
        };

        let source: Arc<str> = Arc::from(text);
        let root = self.parsers.parse(&language, &source)?;
        let mut trees = self.trees.write();
        let stamp = Stamp::next();
        self.own_stamp.fetch_max(stamp.get(), Ordering::AcqRel);
        self.handle.replace_text(text)?;
        let tree = Arc::new(StructuralTree::new(
            root,
            language.clone(),
            source,
            stamp,
            self.handle.id(),
            self.this.clone(),
        ));
        trees.insert(language, tree.clone());
        Ok(tree)
    }

    /// Copy this provider.
    ///
    /// Fails with [`CoreError::Unsupported`] for physical providers. A transient provider is
    /// deep-copied into a fresh synthetic handle.
    pub fn clone_provider(&self) -> CoreResult<Arc<ViewProvider>> {
        match self.kind {
            ProviderKind::Physical => Err(CoreError::Unsupported(
                "cloning a physical view provider",
            )),
            ProviderKind::Transient => {
                let Some(language) = self.base_language().cloned() else {
                    return Err(CoreError::Unsupported("transient provider without a language"));
                };
                let (text, _) = self.snapshot()?;
                ViewProvider::transient(self.parsers.clone(), language, &text)
            }
        }
    }

    /// Drop all cached trees and mark the provider permanently invalid.
    pub(crate) fn invalidate(&self) {
        if self.valid.swap(false, Ordering::AcqRel) {
            self.trees.write().clear();
            tracing::debug!(handle = %self.handle.id(), "view provider invalidated");
        }
    }

    /// Current `(text, stamp)` pair read consistently.
    fn snapshot(&self) -> CoreResult<(Arc<str>, Stamp)> {
        self.check_valid()?;
        match self.kind {
            ProviderKind::Physical => {
                let content = self.handle.content()?;
                let own = Stamp::from_raw(self.own_stamp.load(Ordering::Acquire));
                Ok((Arc::from(content.to_string()), own.max(content.stamp())))
            }
            ProviderKind::Transient => {
                let trees = self.trees.read();
                Ok((self.holder_text(&trees), self.stamp()))
            }
        }
    }

    /// Text of the transient holder tree (the base language's tree).
    fn holder_text(&self, trees: &HashMap<LanguageId, Arc<StructuralTree>>) -> Arc<str> {
        self.base_language()
            .and_then(|base| trees.get(base))
            .map(|tree| tree.source_arc())
            .unwrap_or_else(|| Arc::from(""))
    }

    /// Cache `tree` if `stamp` is still current. `Ok(None)` means the parse was superseded.
    fn publish(
        &self,
        tree: Arc<StructuralTree>,
        stamp: Stamp,
    ) -> CoreResult<Option<Arc<StructuralTree>>> {
        let mut trees = self.trees.write();
        self.check_valid()?;

        let current = self.stamp();
        if current != stamp {
            tracing::trace!(
                handle = %self.handle.id(),
                language = %tree.language(),
                parsed_at = %stamp,
                %current,
                "discarding superseded parse"
            );
            return Ok(None);
        }

        if let Some(existing) = trees.get(tree.language())
            && existing.built_at() == stamp
        {
            return Ok(Some(existing.clone()));
        }

        tracing::debug!(
            handle = %self.handle.id(),
            language = %tree.language(),
            %stamp,
            errors = tree.root().errors().len(),
            "tree published"
        );
        trees.insert(tree.language().clone(), tree.clone());
        Ok(Some(tree))
    }
}

fn transient_name(language: &LanguageId) -> PathBuf {
    PathBuf::from(format!("transient.{language}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_core_lang::LanguageConfig;
    use std::sync::atomic::AtomicUsize;

    fn words(source: &str) -> SyntaxNode {
        let mut root = SyntaxNode::new("file", 0..source.len());
        let mut offset = 0;
        for word in source.split(' ') {
            if !word.is_empty() {
                root.push_child(SyntaxNode::new("word", offset..offset + word.len()));
            }
            offset += word.len() + 1;
        }
        root
    }

    fn parsers() -> Arc<LanguageRegistry> {
        Arc::new(
            LanguageRegistry::new()
                .with_language(LanguageConfig::new("words").with_extension("w"), words),
        )
    }

    #[test]
    fn test_physical_requires_physical_handle() {
        let handle = ContentHandle::synthetic("x.w", "a b");
        assert!(matches!(
            ViewProvider::physical(handle, parsers()),
            Err(CoreError::Unsupported(_))
        ));
    }

    #[test]
    fn test_stamp_tracks_handle_and_root_changes() {
        let handle = ContentHandle::physical("/w/a.w", "a b");
        let provider = ViewProvider::physical(handle.clone(), parsers()).unwrap();
        assert_eq!(provider.stamp(), handle.stamp());

        let replaced = provider
            .root_changed(SyntaxNode::new("file", 0..3), &LanguageId::new("words"))
            .unwrap();
        assert_eq!(provider.stamp(), replaced.built_at());
        assert!(replaced.built_at() > handle.stamp());
        assert!(Arc::ptr_eq(
            &provider.get_tree(&LanguageId::new("words")).unwrap().unwrap(),
            &replaced
        ));

        handle.apply_edit(0..1, "c").unwrap();
        assert_eq!(provider.stamp(), handle.stamp());
    }

    #[test]
    fn test_superseded_parse_is_not_published() {
        let handle = ContentHandle::physical("/w/b.w", "a b");
        let provider = ViewProvider::physical(handle.clone(), parsers()).unwrap();
        let (source, stamp) = provider.snapshot().unwrap();
        let stale = Arc::new(StructuralTree::new(
            words(&source),
            LanguageId::new("words"),
            source,
            stamp,
            handle.id(),
            provider.this.clone(),
        ));

        handle.apply_edit(0..0, "z ").unwrap();
        assert!(provider.publish(stale, stamp).unwrap().is_none());
        assert!(provider.cached_tree(&LanguageId::new("words")).is_none());
    }

    #[test]
    fn test_parse_runs_once_per_stamp() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let parsers = Arc::new(LanguageRegistry::new().with_language(
            LanguageConfig::new("words").with_extension("w"),
            move |source: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
                words(source)
            },
        ));
        let handle = ContentHandle::physical("/w/c.w", "a b c");
        let provider = ViewProvider::physical(handle, parsers).unwrap();
        let words_lang = LanguageId::new("words");

        let first = provider.get_tree(&words_lang).unwrap().unwrap();
        let second = provider.get_tree(&words_lang).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.root().children().len(), 3);
    }

    #[test]
    fn test_invalidate_clears_cache() {
        let handle = ContentHandle::physical("/w/d.w", "a");
        let provider = ViewProvider::physical(handle, parsers()).unwrap();
        let tree = provider
            .get_tree(&LanguageId::new("words"))
            .unwrap()
            .unwrap();
        provider.invalidate();
        assert!(provider.cached_tree(&LanguageId::new("words")).is_none());
        assert!(tree.is_stale());
        assert!(tree.provider().is_err());
    }
}
