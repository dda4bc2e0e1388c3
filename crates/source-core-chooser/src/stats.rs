//! Usage statistics.
//!
//! Counts how often a candidate was selected for a given reference shape. The chooser reads
//! the counts as a secondary ranking key and bumps them on every selection.

use crate::error::StoreError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Statistics key: a (reference shape, candidate) pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UseSignature {
    /// Reference shape (see [`crate::ReferenceSite::shape`]).
    pub reference: String,
    /// Qualified name of the chosen candidate.
    pub candidate: String,
}

impl UseSignature {
    /// Create a signature.
    pub fn new(reference: impl Into<String>, candidate: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            candidate: candidate.into(),
        }
    }
}

impl fmt::Display for UseSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.reference, self.candidate)
    }
}

/// Persisted usage counters.
pub trait StatisticsStore: Send + Sync {
    /// Current count for `signature` (0 if never used).
    fn use_count(&self, signature: &UseSignature) -> Result<u64, StoreError>;

    /// Increment the count for `signature`, returning the new count.
    fn inc_use_count(&self, signature: &UseSignature) -> Result<u64, StoreError>;
}

/// In-memory statistics (not persisted).
#[derive(Debug, Default)]
pub struct MemoryStatisticsStore {
    counts: Mutex<BTreeMap<UseSignature, u64>>,
}

impl MemoryStatisticsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style preset of a count.
    pub fn with_count(self, signature: UseSignature, count: u64) -> Self {
        self.counts.lock().insert(signature, count);
        self
    }
}

impl StatisticsStore for MemoryStatisticsStore {
    fn use_count(&self, signature: &UseSignature) -> Result<u64, StoreError> {
        Ok(self.counts.lock().get(signature).copied().unwrap_or(0))
    }

    fn inc_use_count(&self, signature: &UseSignature) -> Result<u64, StoreError> {
        let mut counts = self.counts.lock();
        let count = counts.entry(signature.clone()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    reference: String,
    candidate: String,
    count: u64,
}

/// Statistics persisted as a JSON file, written through on every increment.
#[derive(Debug)]
pub struct JsonStatisticsStore {
    path: PathBuf,
    counts: Mutex<BTreeMap<UseSignature, u64>>,
}

impl JsonStatisticsStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let counts = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str::<Vec<Entry>>(&json)?
                .into_iter()
                .map(|e| (UseSignature::new(e.reference, e.candidate), e.count))
                .collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), entries = counts.len(), "statistics loaded");
        Ok(Self {
            path,
            counts: Mutex::new(counts),
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, counts: &BTreeMap<UseSignature, u64>) -> Result<(), StoreError> {
        let entries: Vec<Entry> = counts
            .iter()
            .map(|(sig, count)| Entry {
                reference: sig.reference.clone(),
                candidate: sig.candidate.clone(),
                count: *count,
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl StatisticsStore for JsonStatisticsStore {
    fn use_count(&self, signature: &UseSignature) -> Result<u64, StoreError> {
        Ok(self.counts.lock().get(signature).copied().unwrap_or(0))
    }

    fn inc_use_count(&self, signature: &UseSignature) -> Result<u64, StoreError> {
        let mut counts = self.counts.lock();
        let count = counts.get(signature).copied().unwrap_or(0) + 1;
        counts.insert(signature.clone(), count);
        if let Err(err) = self.persist(&counts) {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "failed to persist statistics"
            );
            counts.insert(signature.clone(), count - 1);
            return Err(err);
        }
        Ok(count)
    }
}
