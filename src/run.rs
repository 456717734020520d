//! Drives a full run: every rule in order, then the failure report.

use crate::config::MailSettings;
use crate::deletion::Deleter;
use crate::exclusion::{self, ExclusionSet};
use crate::notify::{Notification, Notifier};
use crate::report::{render_html_report, FailureRecord, RunStats};
use crate::rules::{normalize, EffectiveRule, RawRule, RuleError};
use crate::scanner::scan;

use chrono::{DateTime, Local};
use std::time::SystemTime;
use tracing::{debug, error, info, info_span, warn};

/// Run-wide knobs that do not come from individual rules
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub marker_file: String,
    pub default_age_days: u64,
    pub dry_run: bool,
}

/// Where the aggregator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    /// 1-based index of the rule being processed
    ProcessingRule(usize),
    Reporting,
    Done,
}

/// What happened to one rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Processed(RuleSummary),
    /// Logged only; counters untouched
    Skipped(String),
    /// Recorded in the failure list
    Failed(FailureRecord),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleSummary {
    pub deleted: usize,
    pub failed: usize,
    pub excluded: usize,
    /// Matched the filter but not old enough
    pub retained: usize,
    pub would_delete: usize,
}

/// Delivery target for the failure notification
pub struct Mailer<'a> {
    pub settings: &'a MailSettings,
    pub notifier: &'a dyn Notifier,
}

/// Final result handed back to the caller
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStats,
    pub notified: bool,
}

pub struct RunAggregator<'a> {
    options: RunOptions,
    deleter: &'a dyn Deleter,
    now: SystemTime,
    started_at: DateTime<Local>,
    stats: RunStats,
    phase: RunPhase,
}

impl<'a> RunAggregator<'a> {
    pub fn new(options: RunOptions, deleter: &'a dyn Deleter) -> Self {
        Self::with_clock(options, deleter, SystemTime::now())
    }

    /// Use a fixed reference time for all age comparisons
    pub fn with_clock(options: RunOptions, deleter: &'a dyn Deleter, now: SystemTime) -> Self {
        RunAggregator {
            options,
            deleter,
            now,
            started_at: DateTime::<Local>::from(now),
            stats: RunStats::default(),
            phase: RunPhase::Idle,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Process every rule in input order
    pub fn run(&mut self, rules: &[RawRule]) -> Vec<RuleOutcome> {
        info!("Starting retention run with {} rule(s)", rules.len());
        rules
            .iter()
            .enumerate()
            .map(|(i, raw)| self.process_rule(i + 1, raw))
            .collect()
    }

    /// Normalize, scan and clean a single rule
    pub fn process_rule(&mut self, index: usize, raw: &RawRule) -> RuleOutcome {
        self.phase = RunPhase::ProcessingRule(index);
        let _span = info_span!("rule", index).entered();

        let rule = match normalize(raw, self.options.default_age_days) {
            Ok(rule) => rule,
            Err(RuleError::Failure(mut failure)) => {
                failure.detail = format!("rule {}: {}", index, failure.detail);
                error!("{}", failure);
                self.stats.record_failure(failure.clone());
                return RuleOutcome::Failed(failure);
            }
            Err(RuleError::InvalidConfig { field, value }) => {
                let reason = format!("unknown {} value '{}'", field, value);
                warn!(
                    "Skipping rule for '{}': {}",
                    raw.cleanup_path.trim(),
                    reason
                );
                return RuleOutcome::Skipped(reason);
            }
        };

        info!(
            "Cleaning {} (filter {}, older than {} days, {})",
            rule.path.display(),
            rule.extension_filter,
            rule.age_tolerance_days,
            if rule.recursive { "recursive" } else { "flat" }
        );

        let exclusions = if rule.recursive {
            let set = exclusion::resolve(&rule.path, &self.options.marker_file);
            if !set.is_empty() {
                info!("{} director(ies) carry an exclusion marker", set.len());
            }
            set
        } else {
            if exclusion::has_marker(&rule.path, &self.options.marker_file) {
                let reason = format!(
                    "exclusion marker '{}' present in {}",
                    self.options.marker_file,
                    rule.path.display()
                );
                warn!("Skipping rule: {}", reason);
                return RuleOutcome::Skipped(reason);
            }
            ExclusionSet::default()
        };

        let summary = self.clean(&rule, &exclusions);
        info!(
            "Finished {}: {} deleted, {} failed, {} excluded, {} retained",
            rule.path.display(),
            summary.deleted,
            summary.failed,
            summary.excluded,
            summary.retained
        );
        RuleOutcome::Processed(summary)
    }

    fn clean(&mut self, rule: &EffectiveRule, exclusions: &ExclusionSet) -> RuleSummary {
        let mut summary = RuleSummary::default();
        let mut files = scan(rule, self.now);
        debug!(
            "Selecting files modified before {}",
            DateTime::<Local>::from(files.threshold().cutoff()).format("%Y-%m-%d %H:%M:%S")
        );

        for candidate in files.by_ref() {
            let candidate = match candidate {
                Ok(candidate) => candidate,
                Err(failure) => {
                    error!("Aborting rule: {}", failure);
                    self.stats.record_failure(failure);
                    summary.failed += 1;
                    break;
                }
            };

            if exclusions.excludes_file(&candidate.full_path) {
                info!("Excluded by marker: {}", candidate.full_path.display());
                summary.excluded += 1;
                continue;
            }

            if self.options.dry_run {
                info!("Would delete: {}", candidate.full_path.display());
                self.stats.would_delete += 1;
                summary.would_delete += 1;
                continue;
            }

            match self.deleter.delete(&candidate) {
                Ok(()) => {
                    info!("Deleted: {}", candidate.full_path.display());
                    self.stats.record_deletion(candidate.size);
                    summary.deleted += 1;
                }
                Err(failure) => {
                    error!("{}", failure);
                    self.stats.record_failure(failure);
                    summary.failed += 1;
                }
            }
        }

        summary.retained = files.retained();
        summary
    }

    /// Compose the failure notification for the current stats
    pub fn compose_notification(&self, settings: &MailSettings) -> Notification {
        Notification {
            from: settings.from.clone(),
            to: settings.to.clone(),
            subject: format!("{} ({} failure(s))", settings.subject, self.stats.failure_count),
            html_body: render_html_report(&self.stats, self.started_at),
            priority: settings.priority,
        }
    }

    /// Log the summary and send at most one notification
    pub fn finish(mut self, mailer: Option<Mailer<'_>>) -> RunReport {
        self.phase = RunPhase::Reporting;
        let mut notified = false;

        if self.options.dry_run {
            info!(
                "Dry run complete: {} file(s) would be deleted, {} failure(s)",
                self.stats.would_delete, self.stats.failure_count
            );
        } else if !self.stats.needs_notification() {
            info!(
                "Run complete: {} file(s) deleted ({} freed), no failures",
                self.stats.deleted_count,
                self.stats.freed_display()
            );
        } else {
            warn!(
                "Run complete: {} file(s) deleted ({} freed), {} failure(s)",
                self.stats.deleted_count,
                self.stats.freed_display(),
                self.stats.failure_count
            );
            match mailer {
                Some(mailer) => {
                    let notification = self.compose_notification(mailer.settings);
                    match mailer.notifier.notify(&notification) {
                        Ok(()) => {
                            info!("Failure notification sent to {}", mailer.settings.to.join(", "));
                            notified = true;
                        }
                        Err(err) => error!("Failed to send failure notification: {:#}", err),
                    }
                }
                None => warn!("No [mail] settings configured, failure notification not sent"),
            }
        }

        self.phase = RunPhase::Done;
        RunReport {
            stats: self.stats,
            notified,
        }
    }
}
