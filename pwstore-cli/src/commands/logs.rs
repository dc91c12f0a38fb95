//! Logs command - inspect and prune the event log

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use super::get_store_dir;
use crate::output;
use pwstore_core::domain::format_size;
use pwstore_core::services::logging::now_ms;
use pwstore_core::{EntryPoint, LogEntry, LoggingService};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events, newest first
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// Only failed operations
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove events older than a number of days
    Clear {
        #[arg(long, default_value = "30")]
        older_than_days: u32,
        /// Do not ask for confirmation
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarise the log: size, time span, events by name
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    LoggingService::new(&get_store_dir()?, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn local_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// "ok" or the error message of a failed step
fn outcome(entry: &LogEntry) -> String {
    match &entry.error_message {
        Some(message) => message.red().to_string(),
        None => "ok".green().to_string(),
    }
}

/// Number of entries per event name, alphabetically
fn event_counts(entries: &[LogEntry]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.event.as_str()).or_insert(0) += 1;
    }
    counts
}

pub fn run(command: LogsCommands) -> Result<()> {
    let log = open_log()?;
    match command {
        LogsCommands::List { limit, errors, json } => list(&log, limit, errors, json),
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(&log, older_than_days, force, json),
        LogsCommands::Stats { json } => stats(&log, json),
    }
}

fn list(log: &LoggingService, limit: usize, errors: bool, json: bool) -> Result<()> {
    let entries = if errors {
        log.get_errors(limit)?
    } else {
        log.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        output::info("The event log is empty.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["When", "Command", "Event", "Records", "Outcome"]);
    for entry in &entries {
        table.add_row(vec![
            local_time(entry.timestamp),
            entry.command.clone().unwrap_or_else(|| "-".to_string()),
            entry.event.clone(),
            entry.records.map_or_else(String::new, |n| n.to_string()),
            outcome(entry),
        ]);
    }
    println!("{}", table);
    println!(
        "{}",
        format!("{} of {} entries", entries.len(), log.count()?).dimmed()
    );
    Ok(())
}

fn clear(log: &LoggingService, older_than_days: u32, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove events older than {} days?", older_than_days))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Nothing removed.");
            return Ok(());
        }
    }

    let removed = log.delete_before(now_ms() - i64::from(older_than_days) * DAY_MS)?;
    let remaining = log.count()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "removed": removed,
                "remaining": remaining,
                "olderThanDays": older_than_days,
            })
        );
    } else {
        output::success(&format!("Removed {} events, {} left", removed, remaining));
    }
    Ok(())
}

fn stats(log: &LoggingService, json: bool) -> Result<()> {
    let entries = log.get_recent(usize::MAX)?;
    let failures = entries.iter().filter(|e| e.error_message.is_some()).count();
    let size = std::fs::metadata(log.log_path()).map_or(0, |m| m.len());
    // Newest first
    let span = entries.last().zip(entries.first());
    let by_event = event_counts(&entries);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "path": log.log_path().to_string_lossy(),
                "sizeBytes": size,
                "entries": entries.len(),
                "failures": failures,
                "oldest": span.map(|(oldest, _)| oldest.timestamp),
                "newest": span.map(|(_, newest)| newest.timestamp),
                "events": by_event,
            }))?
        );
        return Ok(());
    }

    println!("{} ({})", log.log_path().display().to_string().bold(), format_size(size));
    println!("  {} entries, {} failed", entries.len(), failures);
    if let Some((oldest, newest)) = span {
        println!("  {} .. {}", local_time(oldest.timestamp), local_time(newest.timestamp));
    }
    if !by_event.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Event", "Count"]);
        for (event, count) in &by_event {
            table.add_row(vec![event.to_string(), count.to_string()]);
        }
        println!("{}", table);
    }
    Ok(())
}
