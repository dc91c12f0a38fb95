//! Set command - change or add a password, then save

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Password;
use pwstore_core::{Error, LogEvent, SetOutcome};

use super::{failure_event, get_logger, is_interactive, log_event, open_database, GlobalArgs};
use crate::output;

/// Prompt for the new password with confirmation, or read one line from
/// stdin when it is not a terminal
fn read_new_password() -> Result<String> {
    if is_interactive() {
        let p = Password::new()
            .with_prompt("New password")
            .with_confirmation("Confirm new password", "Passwords do not match")
            .interact()?;
        return Ok(p);
    }

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read the new password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("No password given on stdin");
    }
    Ok(password)
}

pub fn run(global: &GlobalArgs, account: &str, username: Option<&str>) -> Result<()> {
    if account.is_empty() {
        anyhow::bail!("The account name cannot be empty");
    }
    if [Some(account), username].iter().flatten().any(|f| f.contains(['\t', '\n'])) {
        anyhow::bail!("Account and username cannot contain tab or newline characters");
    }

    let logger = get_logger();
    let mut db = open_database(global, &logger, "set")?;

    // Refuse before prompting; the password would be thrown away anyway
    let matches = db.find(account, username);
    if matches.len() > 1 {
        output::warning("Several records match; add or narrow the username filter:");
        for record in &matches {
            println!("  {:<15} {}", record.account, record.username);
        }
        let err = Error::AmbiguousMatch { count: matches.len() };
        log_event(&logger, failure_event("set_aborted", "set", &err));
        return Err(err.into());
    }

    let password = read_new_password()?;
    if password.contains(['\t', '\n']) {
        anyhow::bail!("Passwords cannot contain tab or newline characters");
    }

    let outcome = db.set(account, username, password)?;

    log_event(&logger, LogEvent::new("save_started").with_command("set"));
    let report = match db.save() {
        Ok(report) => report,
        Err(e) => {
            log_event(&logger, failure_event("save_failed", "set", &e));
            return Err(e).context("Failed to save the database; it was left unchanged");
        }
    };
    log_event(
        &logger,
        LogEvent::new("save_completed")
            .with_command("set")
            .with_records(report.records),
    );

    let who = match username {
        Some(u) if !u.is_empty() => format!("{} ({})", account, u),
        _ => account.to_string(),
    };
    match outcome {
        SetOutcome::Added => output::success(&format!("Added {}", who)),
        SetOutcome::Updated => output::success(&format!("Updated password for {}", who)),
    }
    println!(
        "  {} {} records, {} backup generation(s) kept",
        "Saved".dimmed(),
        report.records,
        db.options().backup_count
    );

    Ok(())
}
