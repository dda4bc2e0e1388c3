#![warn(missing_docs)]
//! `source-core-treesitter` - Tree-sitter integration for `source-core`.
//!
//! [`TreeSitterParser`] implements [`source_core::Parser`] on top of a Tree-sitter grammar.
//! Tree-sitter nodes are converted into [`SyntaxNode`]s (byte ranges, node kinds as reported by
//! the grammar); `ERROR` nodes and missing tokens become error nodes, so malformed input still
//! yields a complete tree.
//!
//! A fresh `tree_sitter::Parser` is created per parse: parsers run concurrently on behalf of
//! different providers and a parse may be discarded, so no parse state is kept between calls.

mod convert;

use source_core::{Parser, SyntaxNode};
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced when building a [`TreeSitterParser`].
pub enum TreeSitterError {
    #[error("tree-sitter language error: {0}")]
    /// Setting the Tree-sitter language failed (e.g. ABI version mismatch).
    Language(String),
}

/// Configuration for [`TreeSitterParser`].
#[derive(Debug, Clone)]
pub struct TreeSitterParserConfig {
    /// Tree-sitter language.
    pub language: tree_sitter::Language,
    /// Keep only named nodes (punctuation and keywords are dropped). Error and missing nodes
    /// are always kept.
    pub named_only: bool,
}

impl TreeSitterParserConfig {
    /// Create a config for `language`.
    ///
    /// By default `named_only` is `true`.
    pub fn new(language: tree_sitter::Language) -> Self {
        Self {
            language,
            named_only: true,
        }
    }

    /// Keep anonymous nodes (punctuation, keywords) as well.
    pub fn with_anonymous_nodes(mut self) -> Self {
        self.named_only = false;
        self
    }
}

/// A [`Parser`] backed by a Tree-sitter grammar.
#[derive(Debug, Clone)]
pub struct TreeSitterParser {
    config: TreeSitterParserConfig,
}

impl TreeSitterParser {
    /// Create a parser from the given config.
    ///
    /// The language is validated up front, so [`Parser::parse`] cannot fail on it later.
    pub fn new(config: TreeSitterParserConfig) -> Result<Self, TreeSitterError> {
        tree_sitter::Parser::new()
            .set_language(&config.language)
            .map_err(|e| TreeSitterError::Language(e.to_string()))?;
        Ok(Self { config })
    }

    /// Shorthand for `TreeSitterParser::new(TreeSitterParserConfig::new(language))`.
    pub fn for_language(language: tree_sitter::Language) -> Result<Self, TreeSitterError> {
        Self::new(TreeSitterParserConfig::new(language))
    }

    /// The config this parser was built from.
    pub fn config(&self) -> &TreeSitterParserConfig {
        &self.config
    }
}

impl Parser for TreeSitterParser {
    fn parse(&self, source: &str) -> SyntaxNode {
        let mut parser = tree_sitter::Parser::new();
        if let Err(err) = parser.set_language(&self.config.language) {
            tracing::warn!(error = %err, "tree-sitter language rejected");
            return SyntaxNode::error(format!("language error: {err}"), 0..source.len());
        }

        match parser.parse(source, None) {
            Some(tree) => convert::to_syntax_node(tree.root_node(), self.config.named_only),
            None => {
                tracing::warn!(len = source.len(), "tree-sitter parse returned no tree");
                SyntaxNode::error("parse aborted", 0..source.len())
            }
        }
    }
}
