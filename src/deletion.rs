//! Removal of a single candidate file.

use crate::report::{FailureContext, FailureRecord};
use crate::scanner::CandidateFile;

use std::fs;

/// Removes one file. Failures are returned, never retried.
pub trait Deleter {
    fn delete(&self, file: &CandidateFile) -> Result<(), FailureRecord>;
}

/// Deletes from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDeleter;

impl Deleter for FsDeleter {
    fn delete(&self, file: &CandidateFile) -> Result<(), FailureRecord> {
        fs::remove_file(&file.full_path).map_err(|err| {
            FailureRecord::new(FailureContext::DeleteFailed, &file.full_path, err.to_string())
        })
    }
}
