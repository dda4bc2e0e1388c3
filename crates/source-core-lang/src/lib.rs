#![warn(missing_docs)]
//! `source-core-lang` - data-driven language identity and configuration for `source-core`.
//!
//! This crate intentionally stays lightweight and does **not** depend on any parsing system.
//! It provides the small value types a host uses to describe which languages exist, which
//! files they claim, and which other languages may be embedded inside them (composite files,
//! e.g. a template language hosting an expression language).

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Identifier of a language (e.g. `"rust"`, `"html"`).
///
/// Cheap to clone; comparisons are by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LanguageId(Arc<str>);

impl LanguageId {
    /// Create a language id from its name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The language name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LanguageId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// Configuration for a single language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageConfig {
    /// Language id.
    pub id: LanguageId,
    /// Human readable name (defaults to the id).
    pub display_name: String,
    /// File extensions claimed by this language, without the leading dot.
    pub extensions: Vec<String>,
    /// Additional languages parsed over the same content when this language is the base
    /// language of a file (composite / multi-language files).
    pub embedded: Vec<LanguageId>,
}

impl LanguageConfig {
    /// Create a config for `id` with no extensions and no embedded languages.
    pub fn new(id: impl Into<LanguageId>) -> Self {
        let id = id.into();
        Self {
            display_name: id.as_str().to_string(),
            id,
            extensions: Vec::new(),
            embedded: Vec::new(),
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Claim one more file extension (leading dots are stripped).
    pub fn with_extension(mut self, ext: impl AsRef<str>) -> Self {
        let ext = ext.as_ref().trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() && !self.extensions.contains(&ext) {
            self.extensions.push(ext);
        }
        self
    }

    /// Add an embedded language.
    pub fn with_embedded(mut self, language: impl Into<LanguageId>) -> Self {
        let language = language.into();
        if language != self.id && !self.embedded.contains(&language) {
            self.embedded.push(language);
        }
        self
    }

    /// Returns `true` if this language claims `path` by extension (case-insensitive).
    pub fn matches_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|claimed| claimed.eq_ignore_ascii_case(ext))
            })
    }

    /// The base language followed by its embedded languages, in declaration order.
    pub fn relevant_languages(&self) -> Vec<LanguageId> {
        let mut out = Vec::with_capacity(1 + self.embedded.len());
        out.push(self.id.clone());
        out.extend(self.embedded.iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        let config = LanguageConfig::new("rust").with_extension(".rs");
        assert!(config.matches_path(Path::new("src/main.rs")));
        assert!(config.matches_path(Path::new("LIB.RS")));
        assert!(!config.matches_path(Path::new("Makefile")));
        assert!(!config.matches_path(Path::new("notes.rst")));
    }

    #[test]
    fn test_relevant_languages_start_with_base() {
        let config = LanguageConfig::new("html")
            .with_embedded("css")
            .with_embedded("js")
            .with_embedded("css")
            .with_embedded("html");
        let names: Vec<_> = config
            .relevant_languages()
            .iter()
            .map(|l| l.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["html", "css", "js"]);
    }

    #[test]
    fn test_display_name_defaults_to_id() {
        assert_eq!(LanguageConfig::new("toml").display_name, "toml");
        assert_eq!(
            LanguageConfig::new("toml")
                .with_display_name("TOML")
                .display_name,
            "TOML"
        );
    }
}
