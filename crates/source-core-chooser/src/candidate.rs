//! Reference sites, candidates and their structural proximity.

use source_core::ContentHandle;
use std::path::PathBuf;
use std::sync::Arc;

/// Structural distance between a reference site and a candidate. Smaller is closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Proximity {
    /// Declared in the same file as the reference.
    SameFile,
    /// Declared in the same module (package / namespace) as the reference.
    SameModule,
    /// Declared in the same library (dependency) as the reference.
    SameLibrary,
    /// No structural relation.
    Unrelated,
}

/// Where an unresolved reference occurs.
#[derive(Debug, Clone)]
pub struct ReferenceSite {
    /// Shape of the reference (typically the referenced short name), used to key statistics.
    pub shape: String,
    /// Module the reference lives in (e.g. `pkg.a`).
    pub module: String,
    /// Library the reference belongs to, if any.
    pub library: Option<String>,
    /// Path of the file containing the reference.
    pub path: Option<PathBuf>,
    /// Handle of the file containing the reference.
    pub handle: Option<Arc<ContentHandle>>,
}

impl ReferenceSite {
    /// Create a site for `shape` inside `module`.
    pub fn new(shape: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            module: module.into(),
            library: None,
            path: None,
            handle: None,
        }
    }

    /// Set the library.
    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    /// Set the containing file path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the containing handle (also sets the path).
    pub fn with_handle(mut self, handle: Arc<ContentHandle>) -> Self {
        self.path = Some(handle.path());
        self.handle = Some(handle);
        self
    }
}

/// A possible resolution target.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Fully qualified, dot separated name (e.g. `pkg.a.Target`).
    pub qualified_name: String,
    /// Declaring module. Defaults to the qualified name without its last segment.
    pub module: String,
    /// Declaring library, if any.
    pub library: Option<String>,
    /// Declaring file path.
    pub path: Option<PathBuf>,
    /// Declaring handle.
    pub handle: Option<Arc<ContentHandle>>,
}

impl Candidate {
    /// Create a candidate; the module is derived from `qualified_name`.
    pub fn new(qualified_name: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        let module = match qualified_name.rfind('.') {
            Some(i) => qualified_name[..i].to_string(),
            None => String::new(),
        };
        Self {
            qualified_name,
            module,
            library: None,
            path: None,
            handle: None,
        }
    }

    /// Override the declaring module.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Set the declaring library.
    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    /// Set the declaring file path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the declaring handle (also sets the path).
    pub fn with_handle(mut self, handle: Arc<ContentHandle>) -> Self {
        self.path = Some(handle.path());
        self.handle = Some(handle);
        self
    }

    /// Last segment of the qualified name.
    pub fn short_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }

    /// Proximity of this candidate to `site`.
    pub fn proximity(&self, site: &ReferenceSite) -> Proximity {
        let same_file = match (&self.handle, &site.handle) {
            (Some(a), Some(b)) => a.id() == b.id(),
            _ => self.path.is_some() && self.path == site.path,
        };
        if same_file {
            Proximity::SameFile
        } else if self.module == site.module {
            Proximity::SameModule
        } else if self.library.is_some() && self.library == site.library {
            Proximity::SameLibrary
        } else {
            Proximity::Unrelated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_is_derived_from_qualified_name() {
        let candidate = Candidate::new("pkg.a.Target");
        assert_eq!(candidate.module, "pkg.a");
        assert_eq!(candidate.short_name(), "Target");
        assert_eq!(Candidate::new("Top").module, "");
    }

    #[test]
    fn test_proximity_levels() {
        let site = ReferenceSite::new("Target", "pkg.a")
            .with_library("core")
            .with_path("/src/pkg/a/user.x");

        let same_file = Candidate::new("pkg.a.user.Target").with_path("/src/pkg/a/user.x");
        let same_module = Candidate::new("pkg.a.Target");
        let same_library = Candidate::new("pkg.b.Target").with_library("core");
        let unrelated = Candidate::new("other.Target").with_library("extra");

        assert_eq!(same_file.proximity(&site), Proximity::SameFile);
        assert_eq!(same_module.proximity(&site), Proximity::SameModule);
        assert_eq!(same_library.proximity(&site), Proximity::SameLibrary);
        assert_eq!(unrelated.proximity(&site), Proximity::Unrelated);
        assert!(Proximity::SameFile < Proximity::Unrelated);
    }

    #[test]
    fn test_missing_library_is_not_same_library() {
        let site = ReferenceSite::new("T", "a");
        assert_eq!(Candidate::new("b.T").proximity(&site), Proximity::Unrelated);
    }
}
