//! Failure records, run statistics and the HTML failure report.

use chrono::{DateTime, Local};
use humansize::{format_size, BINARY};
use std::fmt;
use std::path::Path;

/// Where in the run a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureContext {
    EmptyPath,
    InvalidPath,
    UnreadableDirectory,
    DeleteFailed,
}

impl FailureContext {
    pub fn label(&self) -> &'static str {
        match self {
            FailureContext::EmptyPath => "Empty cleanup path",
            FailureContext::InvalidPath => "Invalid cleanup path",
            FailureContext::UnreadableDirectory => "Unreadable directory",
            FailureContext::DeleteFailed => "Delete failed",
        }
    }
}

impl fmt::Display for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One failure that ends up as a list item in the notification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{context}: {}{detail}", subject_prefix(.subject_path))]
pub struct FailureRecord {
    pub context: FailureContext,
    pub subject_path: String,
    pub detail: String,
}

impl FailureRecord {
    pub fn new(context: FailureContext, subject: impl AsRef<Path>, detail: impl Into<String>) -> Self {
        FailureRecord {
            context,
            subject_path: subject.as_ref().display().to_string(),
            detail: detail.into(),
        }
    }
}

fn subject_prefix(subject: &str) -> String {
    if subject.is_empty() {
        String::new()
    } else {
        format!("{} - ", subject)
    }
}

/// Counters for one run. Counts only ever grow.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub deleted_count: usize,
    pub failure_count: usize,
    pub failures: Vec<FailureRecord>,
    /// Bytes released by successful deletions
    pub freed_bytes: u64,
    /// Candidates that a dry run would have deleted
    pub would_delete: usize,
}

impl RunStats {
    pub fn record_deletion(&mut self, size: u64) {
        self.deleted_count += 1;
        self.freed_bytes += size;
    }

    pub fn record_failure(&mut self, failure: FailureRecord) {
        self.failure_count += 1;
        self.failures.push(failure);
    }

    /// A notification goes out only when something actually failed
    pub fn needs_notification(&self) -> bool {
        self.failure_count > 0
    }

    pub fn freed_display(&self) -> String {
        format_size(self.freed_bytes, BINARY)
    }
}

/// Escape text for interpolation into HTML element content or attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the itemized failure list, one `<li>` per record
pub fn failure_list_html(failures: &[FailureRecord]) -> String {
    let mut html = String::from("<ul>\n");
    for failure in failures {
        html.push_str(&format!(
            "  <li><b>{}</b>: {}{}</li>\n",
            escape_html(failure.context.label()),
            escape_html(&subject_prefix(&failure.subject_path)),
            escape_html(&failure.detail)
        ));
    }
    html.push_str("</ul>\n");
    html
}

/// Render the full notification body for a finished run
pub fn render_html_report(stats: &RunStats, started_at: DateTime<Local>) -> String {
    format!(
        "<html>\n<body>\n\
         <p>Retention run started {}</p>\n\
         <p>Files deleted: {}<br/>\nSpace freed: {}<br/>\nFailures: {}</p>\n\
         {}\
         </body>\n</html>\n",
        started_at.format("%Y-%m-%d %H:%M:%S"),
        stats.deleted_count,
        escape_html(&stats.freed_display()),
        stats.failure_count,
        failure_list_html(&stats.failures)
    )
}
