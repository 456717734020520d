//! Settings file loading.

use crate::exclusion::DEFAULT_MARKER_FILE;
use crate::notify::Priority;
use crate::time::DEFAULT_AGE_DAYS;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings file looked up when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "agesweep.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// CSV rule source
    pub rules: PathBuf,
    /// Log destination (appended to)
    pub log_file: PathBuf,
    /// Exclusion marker file name
    pub marker_file: String,
    /// Tolerance used when a rule leaves AgeTolerance empty
    pub default_age_days: u64,
    /// Failure notification; no mail is sent when absent
    pub mail: Option<MailSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            rules: PathBuf::from("rules.csv"),
            log_file: PathBuf::from("agesweep.log"),
            marker_file: DEFAULT_MARKER_FILE.to_string(),
            default_age_days: DEFAULT_AGE_DAYS,
            mail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailSettings {
    pub from: String,
    pub to: Vec<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub priority: Priority,
}

fn default_subject() -> String {
    "File retention run reported failures".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text).context("Failed to parse settings")?;
        if settings.marker_file.trim().is_empty() {
            anyhow::bail!("marker_file must not be empty");
        }
        Ok(settings)
    }

    /// Load settings from `path`.
    ///
    /// With `required == false` a missing file yields the defaults.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            return Ok(Settings::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid settings in {}", path.display()))
    }
}
