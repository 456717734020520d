use agesweep::{
    CandidateFile, Deleter, FailureContext, FailureRecord, FsDeleter, MailSettings, Mailer,
    Notification, Notifier, Priority, RawRule, RuleOutcome, RunAggregator, RunOptions,
};
use std::cell::RefCell;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::tempdir;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Fails for one specific path, deletes everything else
struct FailingDeleter {
    fail_on: PathBuf,
}

impl Deleter for FailingDeleter {
    fn delete(&self, file: &CandidateFile) -> Result<(), FailureRecord> {
        if file.full_path == self.fail_on {
            return Err(FailureRecord::new(
                FailureContext::DeleteFailed,
                &file.full_path,
                "Permission denied (os error 13)",
            ));
        }
        FsDeleter.delete(file)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: RefCell<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

fn mail_settings() -> MailSettings {
    MailSettings {
        from: "sweeper@example.com".into(),
        to: vec!["ops@example.com".into()],
        subject: "Retention failures".into(),
        smtp_host: "localhost".into(),
        smtp_port: 25,
        priority: Priority::High,
    }
}

fn options() -> RunOptions {
    RunOptions {
        marker_file: "ignore".into(),
        default_age_days: 90,
        dry_run: false,
    }
}

fn rule(path: &Path, ext: &str, age: &str, sub: &str) -> RawRule {
    RawRule {
        cleanup_path: path.display().to_string(),
        file_extension: ext.into(),
        age_tolerance: age.into(),
        include_subfolders: sub.into(),
    }
}

fn write_aged(path: &Path, modified: SystemTime) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "stale data").unwrap();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

#[test]
fn test_flat_rule_deletes_only_stale_files() {
    let dir = tempdir().unwrap();
    let now = SystemTime::now();
    write_aged(&dir.path().join("a.log"), now - DAY * 400);
    write_aged(&dir.path().join("b.log"), now - DAY * 10);

    let deleter = FsDeleter;
    let notifier = RecordingNotifier::default();
    let settings = mail_settings();
    let mut run = RunAggregator::with_clock(options(), &deleter, now);
    run.run(&[rule(dir.path(), "", "", "0")]);
    let report = run.finish(Some(Mailer {
        settings: &settings,
        notifier: &notifier,
    }));

    assert!(!dir.path().join("a.log").exists());
    assert!(dir.path().join("b.log").exists());
    assert_eq!(report.stats.deleted_count, 1);
    assert_eq!(report.stats.failure_count, 0);
    assert!(!report.notified);
    assert!(notifier.sent.borrow().is_empty());
}

#[test]
fn test_one_failed_delete_among_three() {
    let dir = tempdir().unwrap();
    let now = SystemTime::now();
    for name in ["a.txt", "b.txt", "c.txt"] {
        write_aged(&dir.path().join(name), now - DAY * 200);
    }

    let deleter = FailingDeleter {
        fail_on: dir.path().join("b.txt"),
    };
    let notifier = RecordingNotifier::default();
    let settings = mail_settings();
    let mut run = RunAggregator::with_clock(options(), &deleter, now);
    run.run(&[rule(dir.path(), "txt", "30", "0")]);
    let report = run.finish(Some(Mailer {
        settings: &settings,
        notifier: &notifier,
    }));

    assert!(!dir.path().join("a.txt").exists());
    assert!(dir.path().join("b.txt").exists());
    assert!(!dir.path().join("c.txt").exists());
    assert_eq!(report.stats.deleted_count, 2);
    assert_eq!(report.stats.failure_count, 1);
    assert_eq!(report.stats.failures[0].context, FailureContext::DeleteFailed);
    assert!(report.notified);

    let sent = notifier.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].html_body.matches("<li>").count(), 1);
    assert!(sent[0].html_body.contains("b.txt"));
    assert_eq!(sent[0].to, vec!["ops@example.com".to_string()]);
}

#[test]
fn test_marker_does_not_protect_subdirectories() {
    let dir = tempdir().unwrap();
    let now = SystemTime::now();
    let sub = dir.path().join("sub");
    write_aged(&sub.join("ignore"), now - DAY * 500);
    write_aged(&sub.join("kept.txt"), now - DAY * 500);
    write_aged(&sub.join("deep/old.txt"), now - DAY * 500);

    let deleter = FsDeleter;
    let mut run = RunAggregator::with_clock(options(), &deleter, now);
    run.run(&[rule(dir.path(), "", "30", "1")]);

    assert!(sub.join("kept.txt").exists());
    assert!(sub.join("ignore").exists());
    assert!(!sub.join("deep/old.txt").exists());
    assert_eq!(run.stats().deleted_count, 1);
}

#[test]
fn test_second_run_is_a_no_op() {
    let dir = tempdir().unwrap();
    let now = SystemTime::now();
    write_aged(&dir.path().join("x/old.bak"), now - DAY * 120);
    write_aged(&dir.path().join("old.bak"), now - DAY * 120);
    let rules = [rule(dir.path(), "bak", "", "1")];

    let deleter = FsDeleter;
    let mut first = RunAggregator::with_clock(options(), &deleter, now);
    first.run(&rules);
    assert_eq!(first.finish(None).stats.deleted_count, 2);

    let mut second = RunAggregator::with_clock(options(), &deleter, now);
    second.run(&rules);
    let report = second.finish(None);
    assert_eq!(report.stats.deleted_count, 0);
    assert_eq!(report.stats.failure_count, 0);
}

#[test]
fn test_invalid_flag_alone_sends_no_notification() {
    let dir = tempdir().unwrap();
    let now = SystemTime::now();
    write_aged(&dir.path().join("old.txt"), now - DAY * 400);

    let deleter = FsDeleter;
    let notifier = RecordingNotifier::default();
    let settings = mail_settings();
    let mut run = RunAggregator::with_clock(options(), &deleter, now);
    run.run(&[rule(dir.path(), "", "", "5")]);
    let report = run.finish(Some(Mailer {
        settings: &settings,
        notifier: &notifier,
    }));

    assert!(dir.path().join("old.txt").exists());
    assert_eq!(report.stats.deleted_count, 0);
    assert_eq!(report.stats.failure_count, 0);
    assert!(notifier.sent.borrow().is_empty());
}

#[test]
fn test_bad_rules_do_not_stop_the_run() {
    let dir = tempdir().unwrap();
    let now = SystemTime::now();
    write_aged(&dir.path().join("old.txt"), now - DAY * 400);

    let deleter = FsDeleter;
    let notifier = RecordingNotifier::default();
    let settings = mail_settings();
    let mut run = RunAggregator::with_clock(options(), &deleter, now);
    run.run(&[
        RawRule::default(),
        rule(&dir.path().join("missing"), "", "", "0"),
        rule(dir.path(), "", "abc", "0"),
        rule(dir.path(), "", "", "0"),
    ]);
    let report = run.finish(Some(Mailer {
        settings: &settings,
        notifier: &notifier,
    }));

    assert!(!dir.path().join("old.txt").exists());
    assert_eq!(report.stats.deleted_count, 1);
    assert_eq!(report.stats.failure_count, 2);
    let contexts: Vec<_> = report.stats.failures.iter().map(|f| f.context).collect();
    assert_eq!(
        contexts,
        vec![FailureContext::EmptyPath, FailureContext::InvalidPath]
    );
    assert_eq!(notifier.sent.borrow().len(), 1);
}

/// Deletes normally, but removes `doomed` right after deleting `trigger`
struct VanishingDirDeleter {
    trigger: PathBuf,
    doomed: PathBuf,
}

impl Deleter for VanishingDirDeleter {
    fn delete(&self, file: &CandidateFile) -> Result<(), FailureRecord> {
        FsDeleter.delete(file)?;
        if file.full_path == self.trigger {
            fs::remove_dir_all(&self.doomed).unwrap();
        }
        Ok(())
    }
}

#[test]
fn test_directory_vanishing_mid_scan_aborts_only_that_rule() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let now = SystemTime::now();
    // Sorted walk: a.txt is visited before zsub/
    write_aged(&first.path().join("a.txt"), now - DAY * 300);
    write_aged(&first.path().join("zsub/b.txt"), now - DAY * 300);
    write_aged(&second.path().join("c.txt"), now - DAY * 300);

    let deleter = VanishingDirDeleter {
        trigger: first.path().join("a.txt"),
        doomed: first.path().join("zsub"),
    };
    let notifier = RecordingNotifier::default();
    let settings = mail_settings();
    let mut run = RunAggregator::with_clock(options(), &deleter, now);
    let outcomes = run.run(&[
        rule(first.path(), "", "", "1"),
        rule(second.path(), "", "", "0"),
    ]);
    let report = run.finish(Some(Mailer {
        settings: &settings,
        notifier: &notifier,
    }));

    match &outcomes[0] {
        RuleOutcome::Processed(summary) => {
            assert_eq!(summary.deleted, 1);
            assert_eq!(summary.failed, 1);
        }
        other => panic!("first rule was not processed: {:?}", other),
    }
    assert!(!first.path().join("a.txt").exists());
    assert!(!second.path().join("c.txt").exists());

    assert_eq!(report.stats.deleted_count, 2);
    assert_eq!(report.stats.failure_count, 1);
    assert_eq!(
        report.stats.failures[0].context,
        FailureContext::UnreadableDirectory
    );
    assert!(report.notified);

    let sent = notifier.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].html_body.matches("<li>").count(), 1);
    assert!(sent[0].html_body.contains("Unreadable directory"));
}
