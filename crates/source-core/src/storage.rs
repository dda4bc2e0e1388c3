//! Storage collaborators.
//!
//! The kernel never touches the file system directly: physical handles are loaded, saved,
//! renamed and deleted through a [`Storage`] implementation. Storage operations may block and
//! must surface failures as values; retrying is the storage's business, not the kernel's.
//!
//! Two implementations are provided:
//! - [`MemoryStorage`] - an in-memory tree of files, with failure injection for tests
//! - [`FsStorage`] - `std::fs` under a root directory

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
/// Failure reported by a [`Storage`].
pub enum StorageError {
    #[error("`{}` already exists", .0.display())]
    /// The target of a rename already exists.
    NameCollision(PathBuf),

    #[error("`{}` not found", .0.display())]
    /// The source path does not exist.
    NotFound(PathBuf),

    #[error(transparent)]
    /// Any other I/O failure.
    Io(#[from] io::Error),
}

/// Storage operations, used for failure injection in [`MemoryStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    /// [`Storage::load`]
    Load,
    /// [`Storage::write`]
    Write,
    /// [`Storage::rename`]
    Rename,
    /// [`Storage::delete`]
    Delete,
}

/// Backing store for physical handles.
pub trait Storage: Send + Sync {
    /// Read the full text stored at `path`.
    fn load(&self, path: &Path) -> Result<String, StorageError>;

    /// Replace the text stored at `path` (creating it if needed).
    fn write(&self, path: &Path, text: &str) -> Result<(), StorageError>;

    /// Move `from` to `to`. Fails with [`StorageError::NameCollision`] if `to` exists.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError>;

    /// Remove `path`.
    fn delete(&self, path: &Path) -> Result<(), StorageError>;

    /// Returns `true` if something is stored at `path`.
    fn exists(&self, path: &Path) -> bool;
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<PathBuf, String>>,
    pending_failures: Mutex<Vec<StorageOp>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a file.
    pub fn with_file(self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.lock().insert(path.into(), text.into());
        self
    }

    /// Make the next `op` fail with an I/O error.
    pub fn fail_next(&self, op: StorageOp) {
        self.pending_failures.lock().push(op);
    }

    /// Stored text at `path`, if any.
    pub fn file(&self, path: &Path) -> Option<String> {
        self.files.lock().get(path).cloned()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().keys().cloned().collect()
    }

    fn injected(&self, op: StorageOp) -> Result<(), StorageError> {
        let mut pending = self.pending_failures.lock();
        if let Some(pos) = pending.iter().position(|p| *p == op) {
            pending.remove(pos);
            return Err(StorageError::Io(io::Error::other(format!(
                "injected {op:?} failure"
            ))));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn load(&self, path: &Path) -> Result<String, StorageError> {
        self.injected(StorageOp::Load)?;
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_path_buf()))
    }

    fn write(&self, path: &Path, text: &str) -> Result<(), StorageError> {
        self.injected(StorageOp::Write)?;
        self.files
            .lock()
            .insert(path.to_path_buf(), text.to_string());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        self.injected(StorageOp::Rename)?;
        let mut files = self.files.lock();
        if from == to {
            return Ok(());
        }
        if files.contains_key(to) {
            return Err(StorageError::NameCollision(to.to_path_buf()));
        }
        let text = files
            .remove(from)
            .ok_or_else(|| StorageError::NotFound(from.to_path_buf()))?;
        files.insert(to.to_path_buf(), text);
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), StorageError> {
        self.injected(StorageOp::Delete)?;
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }
}

/// File-system storage rooted at a directory. Relative paths resolve against the root.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Create a storage rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

fn map_io(path: &Path, err: io::Error) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound(path.to_path_buf())
    } else {
        StorageError::Io(err)
    }
}

impl Storage for FsStorage {
    fn load(&self, path: &Path) -> Result<String, StorageError> {
        let full = self.resolve(path);
        std::fs::read_to_string(&full).map_err(|e| map_io(path, e))
    }

    fn write(&self, path: &Path, text: &str) -> Result<(), StorageError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, text)?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        let (src, dst) = (self.resolve(from), self.resolve(to));
        if src == dst {
            return Ok(());
        }
        if dst.exists() {
            return Err(StorageError::NameCollision(to.to_path_buf()));
        }
        std::fs::rename(&src, &dst).map_err(|e| map_io(from, e))
    }

    fn delete(&self, path: &Path) -> Result<(), StorageError> {
        std::fs::remove_file(self.resolve(path)).map_err(|e| map_io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }
}
