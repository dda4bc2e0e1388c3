//! Identity manager: rename, delete and batch lookup expressed in terms of trees.
//!
//! Hosts usually hold a [`StructuralTree`] rather than a handle (e.g. the file a refactoring
//! works on). The [`IdentityManager`] maps those tree-level requests onto the owning handle and
//! the [`Workspace`]:
//!
//! - renaming keeps the handle's identity; physical callers receive the canonical tree for
//!   the renamed handle, transient ones get their own tree back
//! - deleting invalidates the handle, its document, its provider and every tree built from it
//! - batch lookups report one outcome per requested path

use crate::error::{CoreError, CoreResult};
use crate::handle::ContentHandle;
use crate::tree::StructuralTree;
use crate::workspace::{Resolved, Workspace};
use source_core_lang::LanguageId;
use std::path::Path;
use std::sync::Arc;

/// Outcome of looking up the tree of one path.
pub type TreeLookup = Resolved<Option<Arc<StructuralTree>>>;

/// Tree-level rename/delete on top of a [`Workspace`].
#[derive(Debug, Clone)]
pub struct IdentityManager {
    workspace: Arc<Workspace>,
}

impl IdentityManager {
    /// Create a manager over `workspace`.
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    /// The underlying workspace.
    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    /// Check that the handle of `tree` may be renamed to `name`.
    pub fn check_set_name(&self, tree: &StructuralTree, name: &str) -> CoreResult<()> {
        let provider = tree.provider()?;
        self.workspace.check_rename(provider.handle(), name)?;
        Ok(())
    }

    /// Rename the handle of `tree` to `name`.
    ///
    /// For physical content the returned tree is the current tree of the renamed handle, which
    /// may be a new instance (for example when the new name maps to another language). If no
    /// language claims the new name the rename still stands and `Ok(None)` is returned. For
    /// transient content the handle is renamed in place and `tree` itself is returned.
    pub fn set_name(
        &self,
        tree: &Arc<StructuralTree>,
        name: &str,
    ) -> CoreResult<Option<Arc<StructuralTree>>> {
        let provider = tree.provider()?;
        let handle = provider.handle().clone();
        self.workspace.rename(&handle, name)?;

        if !provider.is_physical() {
            return Ok(Some(tree.clone()));
        }
        drop(provider);

        if let Some(renamed) = self.workspace.tree(&handle, tree.language())? {
            return Ok(Some(renamed));
        }
        self.workspace.base_tree(&handle)
    }

    /// Delete the handle of `tree`.
    ///
    /// Only physical content can be deleted. On success the handle, its document, its provider
    /// and all of its trees (including `tree`) are permanently invalid.
    pub fn delete(&self, tree: &StructuralTree) -> CoreResult<()> {
        let provider = tree.provider()?;
        if !provider.is_physical() {
            return Err(CoreError::Unsupported("deleting transient content"));
        }
        let handle = provider.handle().clone();
        drop(provider);
        self.workspace.delete(&handle)
    }

    /// Delete `handle` directly.
    pub fn delete_handle(&self, handle: &Arc<ContentHandle>) -> CoreResult<()> {
        self.workspace.delete(handle)
    }

    /// Trees of `language` for many paths, one outcome per path in input order.
    ///
    /// A path that cannot be resolved yields its error; a path whose content does not carry
    /// `language` yields `Ok(None)`. Nothing is skipped.
    pub fn trees_for<I, P>(&self, paths: I, language: &LanguageId) -> Vec<TreeLookup>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.workspace
            .resolve_all(paths)
            .into_iter()
            .map(|resolved| TreeLookup {
                outcome: resolved
                    .outcome
                    .and_then(|handle| self.workspace.tree(&handle, language)),
                path: resolved.path,
            })
            .collect()
    }
}
