//! Persisted chooser settings: the namespace exclusion list.
//!
//! The chooser only records exclusions. Filtering excluded candidates out of a candidate set
//! is left to whoever builds that set, usually via [`ChooserSettings::is_excluded`].

use crate::error::StoreError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Serializable chooser settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChooserSettings {
    /// Excluded namespace prefixes, in the order they were added. Never contains duplicates.
    #[serde(default)]
    pub excluded_prefixes: Vec<String>,
}

impl ChooserSettings {
    /// Empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style exclusion.
    pub fn with_exclusion(mut self, prefix: impl Into<String>) -> Self {
        self.exclude(prefix);
        self
    }

    /// Append `prefix` to the exclusion list. Returns `false` if it was already present.
    pub fn exclude(&mut self, prefix: impl Into<String>) -> bool {
        let prefix = prefix.into();
        if self.excluded_prefixes.contains(&prefix) {
            return false;
        }
        self.excluded_prefixes.push(prefix);
        true
    }

    /// Whether `qualified_name` equals or lies under an excluded prefix.
    pub fn is_excluded(&self, qualified_name: &str) -> bool {
        self.excluded_prefixes.iter().any(|prefix| {
            qualified_name
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        })
    }
}

/// Prefixes a user may choose to exclude for `qualified_name`, longest first.
///
/// The top-level segment on its own is never offered: `a.b.c.D` yields `a.b.c.D`, `a.b.c`
/// and `a.b`.
pub fn exclusion_choices(qualified_name: &str) -> Vec<String> {
    let mut choices = Vec::new();
    let mut name = qualified_name;
    loop {
        choices.push(name.to_string());
        match name.rfind('.') {
            Some(i) if Some(i) != name.find('.') => name = &name[..i],
            _ => break,
        }
    }
    choices
}

/// Persistent exclusion list.
pub trait ExclusionStore: Send + Sync {
    /// Append an exclusion. Returns `false` if it was already recorded.
    fn add_exclusion(&self, prefix: &str) -> Result<bool, StoreError>;

    /// Current settings snapshot.
    fn settings(&self) -> ChooserSettings;
}

/// In-memory exclusion list.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<ChooserSettings>,
}

impl MemorySettingsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExclusionStore for MemorySettingsStore {
    fn add_exclusion(&self, prefix: &str) -> Result<bool, StoreError> {
        Ok(self.settings.lock().exclude(prefix))
    }

    fn settings(&self) -> ChooserSettings {
        self.settings.lock().clone()
    }
}

/// Settings persisted as a JSON file, written through on every change.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    settings: Mutex<ChooserSettings>,
}

impl JsonSettingsStore {
    /// Open the store at `path`. A missing file yields default settings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let settings = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ChooserSettings::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            settings: Mutex::new(settings),
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, settings: &ChooserSettings) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(settings)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl ExclusionStore for JsonSettingsStore {
    fn add_exclusion(&self, prefix: &str) -> Result<bool, StoreError> {
        let mut settings = self.settings.lock();
        if !settings.exclude(prefix) {
            return Ok(false);
        }
        if let Err(err) = self.persist(&settings) {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "failed to persist settings"
            );
            settings.excluded_prefixes.pop();
            return Err(err);
        }
        tracing::debug!(prefix, "exclusion recorded");
        Ok(true)
    }

    fn settings(&self) -> ChooserSettings {
        self.settings.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exclusion_choices() {
        assert_eq!(exclusion_choices("a.b.c.D"), vec!["a.b.c.D", "a.b.c", "a.b"]);
        assert_eq!(exclusion_choices("a.B"), vec!["a.B"]);
        assert_eq!(exclusion_choices("Top"), vec!["Top"]);
    }

    #[test]
    fn test_exclude_is_ordered_and_deduplicated() {
        let mut settings = ChooserSettings::new();
        assert!(settings.exclude("pkg.b"));
        assert!(settings.exclude("java.awt"));
        assert!(!settings.exclude("pkg.b"));
        assert_eq!(settings.excluded_prefixes, vec!["pkg.b", "java.awt"]);
    }

    #[test]
    fn test_is_excluded_matches_whole_segments() {
        let settings = ChooserSettings::new().with_exclusion("pkg.b");
        assert!(settings.is_excluded("pkg.b"));
        assert!(settings.is_excluded("pkg.b.Target"));
        assert!(!settings.is_excluded("pkg.bar.Target"));
        assert!(!settings.is_excluded("pkg.a.Target"));
    }

    #[test]
    fn test_json_settings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chooser.json");

        let store = JsonSettingsStore::open(&path).unwrap();
        assert!(store.add_exclusion("pkg.b").unwrap());
        assert!(!store.add_exclusion("pkg.b").unwrap());
        assert!(store.add_exclusion("pkg.c").unwrap());
        drop(store);

        let reopened = JsonSettingsStore::open(&path).unwrap();
        assert_eq!(
            reopened.settings().excluded_prefixes,
            vec!["pkg.b".to_string(), "pkg.c".to_string()]
        );
    }
}
