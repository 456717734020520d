//! Rule loading from the CSV rule source and normalization into effective rules.

use crate::report::{FailureContext, FailureRecord};
use crate::time::parse_age_days;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// One row of the rule source, exactly as written
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRule {
    #[serde(rename = "CleanupPath", default)]
    pub cleanup_path: String,
    #[serde(rename = "FileExtension", default)]
    pub file_extension: String,
    #[serde(rename = "AgeTolerance", default)]
    pub age_tolerance: String,
    #[serde(rename = "IncludeSubFolders", default)]
    pub include_subfolders: String,
}

/// Load all rules from a CSV file with a header row
pub fn load_rules(path: &Path) -> Result<Vec<RawRule>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open rule source {}", path.display()))?;
    read_rules(reader)
        .with_context(|| format!("Failed to parse rule source {}", path.display()))
}

/// Parse rules from any CSV reader
pub fn read_rules<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<RawRule>> {
    let mut rules = Vec::new();
    for (index, record) in reader.deserialize().enumerate() {
        let rule: RawRule = record.with_context(|| format!("Invalid rule on row {}", index + 1))?;
        rules.push(rule);
    }
    Ok(rules)
}

/// Which files a rule applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionFilter {
    /// `*.*`: every file
    Any,
    /// Files whose extension equals this value (stored without the dot)
    Extension(String),
}

impl ExtensionFilter {
    /// Build a filter from a rule cell. Accepts `log`, `.log` and `*.log`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == "*" || raw == "*.*" {
            return ExtensionFilter::Any;
        }
        let ext = raw.trim_start_matches('*').trim_start_matches('.');
        if ext.is_empty() {
            ExtensionFilter::Any
        } else {
            ExtensionFilter::Extension(ext.to_string())
        }
    }

    /// Check if a file name passes the filter (case-insensitive)
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            ExtensionFilter::Any => true,
            ExtensionFilter::Extension(wanted) => path
                .extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for ExtensionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionFilter::Any => f.write_str("*.*"),
            ExtensionFilter::Extension(ext) => write!(f, "*.{}", ext),
        }
    }
}

/// A rule with every default resolved and the path checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveRule {
    pub path: PathBuf,
    pub extension_filter: ExtensionFilter,
    pub age_tolerance_days: u64,
    pub recursive: bool,
}

/// Why a raw rule could not become an effective rule
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// Reported in the run's failure list
    #[error(transparent)]
    Failure(#[from] FailureRecord),
    /// Logged and skipped; never reaches the failure list
    #[error("unknown {field} value '{value}'")]
    InvalidConfig { field: &'static str, value: String },
}

/// Parse the subfolder flag: empty and "0" mean flat, "1" means recursive
pub fn parse_recursive_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "" | "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

/// Resolve a raw rule into an effective rule.
///
/// `default_age_days` is used when the tolerance cell is empty.
pub fn normalize(raw: &RawRule, default_age_days: u64) -> Result<EffectiveRule, RuleError> {
    let path_str = raw.cleanup_path.trim();
    if path_str.is_empty() {
        return Err(FailureRecord::new(
            FailureContext::EmptyPath,
            "",
            "no cleanup path given",
        )
        .into());
    }

    let path = PathBuf::from(path_str);
    if !path.is_dir() {
        return Err(FailureRecord::new(
            FailureContext::InvalidPath,
            &path,
            "path does not exist or is not a directory",
        )
        .into());
    }

    let age_tolerance_days = match parse_age_days(&raw.age_tolerance) {
        Ok(Some(days)) => days,
        Ok(None) => default_age_days,
        Err(_) => {
            return Err(RuleError::InvalidConfig {
                field: "AgeTolerance",
                value: raw.age_tolerance.clone(),
            })
        }
    };

    let recursive =
        parse_recursive_flag(&raw.include_subfolders).ok_or_else(|| RuleError::InvalidConfig {
            field: "IncludeSubFolders",
            value: raw.include_subfolders.clone(),
        })?;

    Ok(EffectiveRule {
        path,
        extension_filter: ExtensionFilter::parse(&raw.file_extension),
        age_tolerance_days,
        recursive,
    })
}
