//! agesweep - Rule-driven file retention
//!
//! agesweep reads a list of directory rules from a CSV file and deletes files
//! older than each rule's age tolerance. Directories carrying an exclusion
//! marker file keep their own files. Failures are isolated per rule or per
//! file, collected for the whole run, and reported in a single HTML email
//! only when at least one occurred.
//!
//! ## Flow
//!
//! `run::RunAggregator` processes rules in input order:
//! normalize (`rules`) → resolve markers (`exclusion`, recursive rules only)
//! → select stale files (`scanner`) → remove each one (`deletion`), folding
//! every outcome into `report::RunStats`.

pub mod config;
pub mod deletion;
pub mod exclusion;
pub mod logging;
pub mod notify;
pub mod report;
pub mod rules;
pub mod run;
pub mod scanner;
pub mod time;

// Re-export commonly used items
pub use config::{MailSettings, Settings};
pub use deletion::{Deleter, FsDeleter};
pub use exclusion::{ExclusionSet, DEFAULT_MARKER_FILE};
pub use notify::{Notification, Notifier, Priority, SmtpNotifier};
pub use report::{FailureContext, FailureRecord, RunStats};
pub use rules::{load_rules, normalize, EffectiveRule, ExtensionFilter, RawRule, RuleError};
pub use run::{Mailer, RuleOutcome, RunAggregator, RunOptions, RunPhase, RunReport};
pub use scanner::{scan, CandidateFile};
pub use time::{AgeThreshold, DEFAULT_AGE_DAYS};
