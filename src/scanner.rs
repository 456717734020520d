//! Directory walking and stale file selection for one rule.

use crate::report::{FailureContext, FailureRecord};
use crate::rules::EffectiveRule;
use crate::time::AgeThreshold;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A stale file selected for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub full_path: PathBuf,
    pub parent_directory: PathBuf,
    pub last_modified: SystemTime,
    pub size: u64,
}

/// Lazy scan over one rule's directory.
///
/// Yields `Ok` for each stale file matching the rule's filter. The first
/// directory error yields a single `UnreadableDirectory` failure and ends the
/// scan for this rule. Matching files that are too new are only counted.
pub struct Scan {
    root: PathBuf,
    walker: walkdir::IntoIter,
    rule: EffectiveRule,
    threshold: AgeThreshold,
    retained: usize,
    finished: bool,
}

/// Start scanning a rule, treating `now` as the run's reference time
pub fn scan(rule: &EffectiveRule, now: SystemTime) -> Scan {
    let max_depth = if rule.recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(&rule.path)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    Scan {
        root: rule.path.clone(),
        walker,
        rule: rule.clone(),
        threshold: AgeThreshold::new(rule.age_tolerance_days, now),
        retained: 0,
        finished: false,
    }
}

impl Scan {
    pub fn threshold(&self) -> AgeThreshold {
        self.threshold
    }

    /// Files seen so far that matched the filter but were not stale
    pub fn retained(&self) -> usize {
        self.retained
    }

    fn unreadable(&mut self, path: &Path, detail: String) -> FailureRecord {
        self.finished = true;
        FailureRecord::new(FailureContext::UnreadableDirectory, path, detail)
    }
}

impl Iterator for Scan {
    type Item = Result<CandidateFile, FailureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    let detail = err
                        .io_error()
                        .map(|io| io.to_string())
                        .unwrap_or_else(|| err.to_string());
                    return Some(Err(self.unreadable(&path, detail)));
                }
            };

            // Symlinks are neither followed nor removed
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.rule.extension_filter.matches(path) {
                continue;
            }

            // Use symlink_metadata to avoid following symlinks
            let metadata = match fs::symlink_metadata(path) {
                Ok(meta) => meta,
                Err(err) => {
                    // Vanished between listing and stat; nothing left to delete
                    warn!("Could not get metadata for {}: {}", path.display(), err);
                    continue;
                }
            };

            let modified = match metadata.modified() {
                Ok(mtime) => mtime,
                Err(err) => {
                    warn!(
                        "Could not get modification time for {}: {}",
                        path.display(),
                        err
                    );
                    continue;
                }
            };

            if !self.threshold.is_stale(modified) {
                debug!("Retained (too new): {}", path.display());
                self.retained += 1;
                continue;
            }

            let parent_directory = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root.clone());

            return Some(Ok(CandidateFile {
                full_path: path.to_path_buf(),
                parent_directory,
                last_modified: modified,
                size: metadata.len(),
            }));
        }
    }
}
