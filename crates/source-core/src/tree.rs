//! Structural trees.
//!
//! A [`StructuralTree`] is the result of parsing one handle's content with one language's
//! [`crate::Parser`]. It is immutable: when the content changes the provider builds a new tree
//! instead of patching the old one. The tree records the stamp it was built at and holds only
//! a [`Weak`] reference to its owning [`ViewProvider`], so providers and trees never form a
//! strong cycle.

use crate::error::{CoreError, CoreResult};
use crate::handle::HandleId;
use crate::provider::ViewProvider;
use crate::stamp::Stamp;
use source_core_lang::LanguageId;
use std::ops::Range;
use std::sync::{Arc, Weak};

/// Node kind used for error nodes produced on malformed input.
pub const ERROR_KIND: &str = "ERROR";

/// A node of a parsed tree. Ranges are byte offsets into the parsed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    kind: String,
    range: Range<usize>,
    children: Vec<SyntaxNode>,
    message: Option<String>,
}

impl SyntaxNode {
    /// Create a leaf node.
    pub fn new(kind: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            kind: kind.into(),
            range,
            children: Vec::new(),
            message: None,
        }
    }

    /// Create a node with children.
    pub fn with_children(
        kind: impl Into<String>,
        range: Range<usize>,
        children: Vec<SyntaxNode>,
    ) -> Self {
        Self {
            kind: kind.into(),
            range,
            children,
            message: None,
        }
    }

    /// Create an error node covering `range`.
    pub fn error(message: impl Into<String>, range: Range<usize>) -> Self {
        Self {
            kind: ERROR_KIND.to_string(),
            range,
            children: Vec::new(),
            message: Some(message.into()),
        }
    }

    /// Append a child.
    pub fn push_child(&mut self, child: SyntaxNode) {
        self.children.push(child);
    }

    /// Node kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Byte range in the parsed source.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Child nodes.
    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    /// Whether this node is an error node.
    pub fn is_error(&self) -> bool {
        self.message.is_some()
    }

    /// Error message for error nodes.
    pub fn error_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Text covered by this node, or `""` if the range does not fit `source`.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.range.clone()).unwrap_or("")
    }

    /// Pre-order traversal of this node and all its descendants.
    pub fn descendants(&self) -> impl Iterator<Item = &SyntaxNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// All error nodes, in pre-order.
    pub fn errors(&self) -> Vec<&SyntaxNode> {
        self.descendants().filter(|n| n.is_error()).collect()
    }

    /// Returns `true` if this node or any descendant is an error node.
    pub fn has_errors(&self) -> bool {
        self.descendants().any(SyntaxNode::is_error)
    }
}

/// A parsed tree for one (handle, language) pair.
#[derive(Debug)]
pub struct StructuralTree {
    root: SyntaxNode,
    language: LanguageId,
    source: Arc<str>,
    built_at: Stamp,
    handle: HandleId,
    owner: Weak<ViewProvider>,
}

impl StructuralTree {
    pub(crate) fn new(
        root: SyntaxNode,
        language: LanguageId,
        source: Arc<str>,
        built_at: Stamp,
        handle: HandleId,
        owner: Weak<ViewProvider>,
    ) -> Self {
        Self {
            root,
            language,
            source,
            built_at,
            handle,
            owner,
        }
    }

    /// Root node. Stays inspectable after the tree went stale.
    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    /// Language the tree was parsed with.
    pub fn language(&self) -> &LanguageId {
        &self.language
    }

    /// Stamp of the provider at parse time.
    pub fn built_at(&self) -> Stamp {
        self.built_at
    }

    /// Id of the handle this tree was parsed from.
    pub fn handle_id(&self) -> HandleId {
        self.handle
    }

    /// The exact text this tree was parsed from, regardless of staleness.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn source_arc(&self) -> Arc<str> {
        self.source.clone()
    }

    /// The owning provider.
    ///
    /// Fails with [`CoreError::Invalidated`] once the handle was deleted or the provider was
    /// dropped.
    pub fn provider(&self) -> CoreResult<Arc<ViewProvider>> {
        let provider = self
            .owner
            .upgrade()
            .ok_or(CoreError::Invalidated(self.handle))?;
        provider.check_valid()?;
        Ok(provider)
    }

    /// The parsed text, failing with [`CoreError::Invalidated`] after delete.
    pub fn text(&self) -> CoreResult<&str> {
        self.provider()?;
        Ok(&self.source)
    }

    /// Returns `true` if the provider moved past the stamp this tree was built at (or is gone).
    pub fn is_stale(&self) -> bool {
        match self.owner.upgrade() {
            Some(provider) => !provider.is_valid() || provider.stamp() != self.built_at,
            None => true,
        }
    }

    /// Whether the tree is current for its provider.
    pub fn is_valid(&self) -> bool {
        !self.is_stale()
    }

    /// Whether the owning provider is physical. `false` once the provider is gone.
    pub fn is_physical(&self) -> bool {
        self.owner.upgrade().is_some_and(|p| p.is_physical())
    }

    /// Re-fetch the current tree for the same provider and language.
    pub fn current(&self) -> CoreResult<Arc<StructuralTree>> {
        self.provider()?
            .get_tree(&self.language)?
            .ok_or(CoreError::Invalidated(self.handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyntaxNode {
        SyntaxNode::with_children(
            "file",
            0..9,
            vec![
                SyntaxNode::new("word", 0..3),
                SyntaxNode::with_children(
                    "group",
                    4..9,
                    vec![SyntaxNode::error("unexpected `)`", 8..9)],
                ),
            ],
        )
    }

    #[test]
    fn test_descendants_are_preorder() {
        let root = sample();
        let kinds: Vec<_> = root.descendants().map(|n| n.kind().to_string()).collect();
        assert_eq!(kinds, vec!["file", "word", "group", ERROR_KIND]);
    }

    #[test]
    fn test_errors_are_collected() {
        let root = sample();
        assert!(root.has_errors());
        let errors = root.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_message(), Some("unexpected `)`"));
        assert!(!root.children()[0].has_errors());
    }

    #[test]
    fn test_node_text_slices_source() {
        let root = sample();
        let source = "abc (de))";
        assert_eq!(root.children()[0].text(source), "abc");
        assert_eq!(SyntaxNode::new("oob", 5..50).text(source), "");
    }

    #[test]
    fn test_orphan_tree_is_stale_and_invalidated() {
        let handle = HandleId::allocate();
        let tree = StructuralTree::new(
            sample(),
            LanguageId::new("t"),
            Arc::from("abc (de))"),
            Stamp::next(),
            handle,
            Weak::new(),
        );
        assert!(tree.is_stale());
        assert_eq!(tree.source(), "abc (de))");
        assert!(matches!(tree.text(), Err(CoreError::Invalidated(id)) if id == handle));
        assert!(tree.current().is_err());
    }
}
