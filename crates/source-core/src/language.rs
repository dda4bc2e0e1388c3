//! Parsers and the language registry.
//!
//! The kernel defines no grammar. Hosts register one [`Parser`] per language together with a
//! [`LanguageConfig`] describing which files the language claims and which other languages are
//! embedded in it. A [`crate::ViewProvider`] asks the registry for the set of relevant
//! languages of its handle's path and for the parser of each.

use crate::error::{CoreError, CoreResult};
use crate::tree::SyntaxNode;
use source_core_lang::{LanguageConfig, LanguageId};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A language-specific parser.
///
/// Parsing must be total: malformed input yields a tree containing error nodes
/// ([`SyntaxNode::error`]), never a panic or an error value. Implementations must be pure
/// functions of `source`, because parses may run concurrently and be discarded.
pub trait Parser: Send + Sync {
    /// Parse `source` into a tree.
    fn parse(&self, source: &str) -> SyntaxNode;
}

impl<F> Parser for F
where
    F: Fn(&str) -> SyntaxNode + Send + Sync,
{
    fn parse(&self, source: &str) -> SyntaxNode {
        self(source)
    }
}

struct LanguageEntry {
    config: LanguageConfig,
    parser: Arc<dyn Parser>,
}

/// Registry of languages known to a workspace.
#[derive(Default)]
pub struct LanguageRegistry {
    entries: BTreeMap<LanguageId, LanguageEntry>,
    fallback: Option<LanguageId>,
}

impl fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageRegistry")
            .field("languages", &self.entries.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl LanguageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a language.
    pub fn register(&mut self, config: LanguageConfig, parser: Arc<dyn Parser>) {
        tracing::debug!(language = %config.id, "language registered");
        self.entries
            .insert(config.id.clone(), LanguageEntry { config, parser });
    }

    /// Builder-style [`LanguageRegistry::register`].
    pub fn with_language(
        mut self,
        config: LanguageConfig,
        parser: impl Parser + 'static,
    ) -> Self {
        self.register(config, Arc::new(parser));
        self
    }

    /// Language used for paths no registered language claims.
    pub fn with_fallback(mut self, language: impl Into<LanguageId>) -> Self {
        self.fallback = Some(language.into());
        self
    }

    /// Returns `true` if `language` has a parser.
    pub fn contains(&self, language: &LanguageId) -> bool {
        self.entries.contains_key(language)
    }

    /// Registered language ids, sorted.
    pub fn languages(&self) -> impl Iterator<Item = &LanguageId> {
        self.entries.keys()
    }

    /// Config of a registered language.
    pub fn config(&self, language: &LanguageId) -> Option<&LanguageConfig> {
        self.entries.get(language).map(|e| &e.config)
    }

    /// Parser of a registered language.
    pub fn parser(&self, language: &LanguageId) -> CoreResult<Arc<dyn Parser>> {
        self.entries
            .get(language)
            .map(|e| e.parser.clone())
            .ok_or_else(|| CoreError::UnknownLanguage(language.clone()))
    }

    /// Parse `source` with the parser registered for `language`.
    pub fn parse(&self, language: &LanguageId, source: &str) -> CoreResult<SyntaxNode> {
        Ok(self.parser(language)?.parse(source))
    }

    /// Base language claiming `path`, falling back to the configured fallback language.
    pub fn language_for_path(&self, path: &Path) -> Option<LanguageId> {
        self.entries
            .values()
            .find(|e| e.config.matches_path(path))
            .map(|e| e.config.id.clone())
            .or_else(|| self.fallback.clone().filter(|l| self.contains(l)))
    }

    /// Base language of `path` followed by its embedded languages.
    ///
    /// Embedded languages without a registered parser are skipped. Empty when no language
    /// claims the path and no fallback is set.
    pub fn languages_for_path(&self, path: &Path) -> Vec<LanguageId> {
        let Some(base) = self.language_for_path(path) else {
            return Vec::new();
        };
        match self.config(&base) {
            Some(config) => config
                .relevant_languages()
                .into_iter()
                .filter(|l| {
                    let known = self.contains(l);
                    if !known {
                        tracing::trace!(language = %l, "embedded language has no parser");
                    }
                    known
                })
                .collect(),
            None => vec![base],
        }
    }
}
