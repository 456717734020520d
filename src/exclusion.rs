//! Exclusion markers: directories that carry a marker file keep their own files.
//!
//! A marker only protects the files sitting directly next to it. Subdirectories
//! of a marked directory are still cleaned unless they carry their own marker.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Marker file name used when the settings do not name one
pub const DEFAULT_MARKER_FILE: &str = "ignore";

/// Directories whose direct files must not be deleted
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExclusionSet {
    dirs: HashSet<PathBuf>,
}

impl ExclusionSet {
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Check if a directory is excluded (exact match, no ancestor lookup)
    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.contains(dir)
    }

    /// Check if a file sits directly inside an excluded directory
    pub fn excludes_file(&self, file: &Path) -> bool {
        file.parent().is_some_and(|parent| self.contains(parent))
    }
}

/// Check if a single directory carries the marker
pub fn has_marker(dir: &Path, marker_file: &str) -> bool {
    dir.join(marker_file).is_file()
}

/// Collect every directory under `root` (root included) that directly holds
/// a file named `marker_file`.
///
/// Unreadable subtrees are skipped here; the scan reports them.
pub fn resolve(root: &Path, marker_file: &str) -> ExclusionSet {
    let mut dirs = HashSet::new();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() && entry.file_name() == marker_file {
            if let Some(parent) = entry.path().parent() {
                debug!("Exclusion marker found in {}", parent.display());
                dirs.insert(parent.to_path_buf());
            }
        }
    }

    ExclusionSet { dirs }
}
