//! Handle → provider registry.
//!
//! The registry is an explicit object: a host constructs it, passes it (behind an `Arc`) to the
//! components that need it and tears it down with [`ProviderRegistry::dispose`]. There is no
//! process-global instance.
//!
//! Physical providers are held strongly, at most one per handle. Transient providers may
//! register themselves for reverse lookup by their synthetic handle id; those entries are weak,
//! so registration never keeps a scratch provider alive, and they are never reachable by path.

use crate::error::{CoreError, CoreResult};
use crate::handle::{ContentHandle, HandleId};
use crate::provider::ViewProvider;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Registry of view providers, keyed by handle id.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    physical: Mutex<HashMap<HandleId, Arc<ViewProvider>>>,
    transient: Mutex<HashMap<HandleId, Weak<ViewProvider>>>,
    disposed: AtomicBool,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered physical providers.
    pub fn len(&self) -> usize {
        self.physical.lock().len()
    }

    /// Returns `true` if no physical provider is registered.
    pub fn is_empty(&self) -> bool {
        self.physical.lock().is_empty()
    }

    /// Whether [`ProviderRegistry::dispose`] was called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Provider registered for `id`: the physical provider, or a live transient one.
    pub fn get(&self, id: HandleId) -> Option<Arc<ViewProvider>> {
        if let Some(provider) = self.physical.lock().get(&id) {
            return Some(provider.clone());
        }
        self.transient.lock().get(&id).and_then(Weak::upgrade)
    }

    /// Physical provider for `handle`, creating it with `create` on first use.
    ///
    /// `create` runs outside the registry lock. When two callers race on the first request for
    /// the same handle, exactly one provider is inserted and returned to both; the loser is
    /// dropped. Providers are side-effect free until first used, so dropping one is harmless.
    pub fn get_or_create<F>(
        &self,
        handle: &Arc<ContentHandle>,
        create: F,
    ) -> CoreResult<Arc<ViewProvider>>
    where
        F: FnOnce() -> CoreResult<Arc<ViewProvider>>,
    {
        self.check_open(handle)?;
        if let Some(provider) = self.physical.lock().get(&handle.id()) {
            return Ok(provider.clone());
        }

        let candidate = create()?;

        let mut physical = self.physical.lock();
        self.check_open(handle)?;
        let winner = physical
            .entry(handle.id())
            .or_insert_with(|| candidate.clone())
            .clone();
        if Arc::ptr_eq(&winner, &candidate) {
            tracing::debug!(handle = %handle.id(), "view provider registered");
        } else {
            tracing::trace!(handle = %handle.id(), "lost provider creation race, discarding");
        }
        Ok(winner)
    }

    /// Record a transient provider for reverse lookup by its synthetic handle id.
    pub fn register_transient(&self, provider: &Arc<ViewProvider>) -> CoreResult<()> {
        if provider.is_physical() {
            return Err(CoreError::Unsupported(
                "registering a physical provider as transient",
            ));
        }
        let mut transient = self.transient.lock();
        transient.retain(|_, weak| weak.strong_count() > 0);
        transient.insert(provider.handle().id(), Arc::downgrade(provider));
        Ok(())
    }

    /// Remove and invalidate the physical provider of `id`.
    pub fn evict(&self, id: HandleId) -> Option<Arc<ViewProvider>> {
        let provider = self.physical.lock().remove(&id)?;
        provider.invalidate();
        tracing::debug!(handle = %id, "view provider evicted");
        Some(provider)
    }

    /// Tear the registry down: every physical provider is invalidated and dropped, and no
    /// further providers can be created.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let drained: Vec<_> = self.physical.lock().drain().collect();
        for (_, provider) in &drained {
            provider.invalidate();
        }
        self.transient.lock().clear();
        tracing::debug!(providers = drained.len(), "provider registry disposed");
    }

    fn check_open(&self, handle: &ContentHandle) -> CoreResult<()> {
        if self.is_disposed() {
            return Err(CoreError::Invalidated(handle.id()));
        }
        handle.check_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageRegistry;
    use crate::tree::SyntaxNode;
    use source_core_lang::{LanguageConfig, LanguageId};

    fn parsers() -> Arc<LanguageRegistry> {
        Arc::new(LanguageRegistry::new().with_language(
            LanguageConfig::new("plain").with_extension("txt"),
            |source: &str| SyntaxNode::new("file", 0..source.len()),
        ))
    }

    #[test]
    fn test_get_or_create_returns_existing() {
        let registry = ProviderRegistry::new();
        let parsers = parsers();
        let handle = ContentHandle::physical("/r/a.txt", "a");

        let first = registry
            .get_or_create(&handle, || ViewProvider::physical(handle.clone(), parsers.clone()))
            .unwrap();
        let second = registry
            .get_or_create(&handle, || panic!("provider must not be created twice"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_creation_converges() {
        let registry = Arc::new(ProviderRegistry::new());
        let parsers = parsers();
        let handle = ContentHandle::physical("/r/b.txt", "b");

        let barrier = Arc::new(std::sync::Barrier::new(8));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let parsers = parsers.clone();
                let handle = handle.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    registry
                        .get_or_create(&handle, || {
                            ViewProvider::physical(handle.clone(), parsers.clone())
                        })
                        .unwrap()
                })
            })
            .collect();

        let providers: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert!(providers.iter().all(|p| Arc::ptr_eq(p, &providers[0])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_transient_registration_is_weak() {
        let registry = ProviderRegistry::new();
        let provider =
            ViewProvider::transient(parsers(), LanguageId::new("plain"), "scratch").unwrap();
        let id = provider.handle().id();
        registry.register_transient(&provider).unwrap();
        assert!(registry.get(id).is_some());
        assert!(registry.is_empty());

        drop(provider);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn test_dispose_invalidates_and_blocks_creation() {
        let registry = ProviderRegistry::new();
        let parsers = parsers();
        let handle = ContentHandle::physical("/r/c.txt", "c");
        let provider = registry
            .get_or_create(&handle, || ViewProvider::physical(handle.clone(), parsers.clone()))
            .unwrap();

        registry.dispose();
        assert!(!provider.is_valid());
        assert!(registry.is_empty());
        assert!(
            registry
                .get_or_create(&handle, || ViewProvider::physical(handle.clone(), parsers.clone()))
                .is_err()
        );
    }
}
