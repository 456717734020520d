use agesweep::config::{Settings, DEFAULT_CONFIG_FILE};
use agesweep::{load_rules, logging, FsDeleter, Mailer, RunAggregator, RunOptions, SmtpNotifier};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Delete files older than per-directory retention rules",
    long_about = None
)]
struct Args {
    /// Settings file (defaults to agesweep.toml in the current directory, if present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// CSV rule source, overriding the settings file
    #[arg(long, short)]
    rules: Option<PathBuf>,

    /// Log file, overriding the settings file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Report what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Log every retained and excluded file
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load(path, true)?,
        None => Settings::load(&PathBuf::from(DEFAULT_CONFIG_FILE), false)?,
    };
    if let Some(rules) = args.rules {
        settings.rules = rules;
    }
    if let Some(log_file) = args.log_file {
        settings.log_file = log_file;
    }

    logging::init(&settings.log_file, args.verbose)?;

    // The only fatal condition: without rules there is nothing to run
    let rules = load_rules(&settings.rules).context("Failed to load cleanup rules")?;

    let options = RunOptions {
        marker_file: settings.marker_file.clone(),
        default_age_days: settings.default_age_days,
        dry_run: args.dry_run,
    };
    let deleter = FsDeleter;
    let mut run = RunAggregator::new(options, &deleter);
    run.run(&rules);

    let notifier = settings
        .mail
        .as_ref()
        .map(|mail| SmtpNotifier::new(mail.smtp_host.clone(), mail.smtp_port));
    let mailer = settings
        .mail
        .as_ref()
        .zip(notifier.as_ref())
        .map(|(settings, notifier)| Mailer { settings, notifier });

    let report = run.finish(mailer);
    let stats = &report.stats;

    println!("========================================");
    if args.dry_run {
        println!(
            "{}",
            format!("Dry run: {} file(s) would be deleted", stats.would_delete).bold()
        );
    } else {
        println!(
            "Deleted: {} ({} freed)",
            stats.deleted_count.to_string().bold(),
            stats.freed_display().bold().green()
        );
    }
    if stats.failure_count > 0 {
        println!(
            "Failures: {}{}",
            stats.failure_count.to_string().bold().red(),
            if report.notified { " (notification sent)" } else { "" }
        );
    } else {
        println!("Failures: {}", "0".green());
    }

    Ok(())
}
