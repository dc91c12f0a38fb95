//! CLI command implementations

pub mod backups;
pub mod find;
pub mod logs;
pub mod set;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use dialoguer::Password;
use pwstore_core::{Config, Database, EntryPoint, Error, LogEvent, LoggingService, Secret};

/// Options shared by every command; each overrides the config file
pub struct GlobalArgs {
    pub db: Option<PathBuf>,
    pub backups: Option<usize>,
    pub recipient: Option<String>,
}

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let store_dir = get_store_dir().ok()?;
    LoggingService::new(&store_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Event for a failed step of `command`
///
/// The message is the user-facing text; the details keep the error variant
/// and its fields. Neither ever holds record contents.
pub fn failure_event(event: &str, command: &str, err: &Error) -> LogEvent {
    LogEvent::new(event)
        .with_command(command)
        .with_error(err.to_string())
        .with_error_details(format!("{:?}", err))
}

/// Get the store directory (settings and logs) from environment or default
pub fn get_store_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var("PWSTORE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".pwstore"))
}

/// Load config and apply command-line overrides
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let store_dir = get_store_dir()?;
    let mut config = Config::load(&store_dir)?;

    if let Some(db) = &global.db {
        config.database_path = Some(db.clone());
    }
    if let Some(backups) = global.backups {
        config.backup_count = Some(backups);
    }
    if let Some(recipient) = &global.recipient {
        config.recipient = Some(recipient.clone());
    }
    Ok(config)
}

/// Whether stdin is an interactive terminal
pub fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Get the master passphrase from PWSTORE_PASSPHRASE or a hidden prompt
fn get_passphrase() -> Result<Secret> {
    if let Ok(p) = env::var("PWSTORE_PASSPHRASE") {
        return Ok(Secret::new(p));
    }

    if !is_interactive() {
        anyhow::bail!("No terminal to prompt for the passphrase; set PWSTORE_PASSPHRASE");
    }

    let p = Password::new()
        .with_prompt("Master passphrase")
        .allow_empty_password(true)
        .interact()?;
    Ok(Secret::new(p))
}

/// Open and load the database described by `global`
///
/// The passphrase is only asked for when the file exists, since a new
/// database has nothing to decrypt.
pub fn open_database(
    global: &GlobalArgs,
    logger: &Option<LoggingService>,
    command: &str,
) -> Result<Database> {
    let config = load_config(global)?;
    let path = config.database_path()?;

    let secret = if path.exists() {
        get_passphrase()?
    } else {
        Secret::new(String::new())
    };

    let mut db = Database::open(
        &path,
        secret,
        config.database_options(),
        Arc::new(config.gpg_backend()),
    )
    .with_context(|| format!("Failed to open {}", path.display()))?;

    log_event(logger, LogEvent::new("load_started").with_command(command));
    match db.load() {
        Ok(()) => {
            log_event(
                logger,
                LogEvent::new("load_completed")
                    .with_command(command)
                    .with_records(db.records().len()),
            );
            Ok(db)
        }
        Err(e) => {
            log_event(logger, failure_event("load_failed", command, &e));
            Err(e).with_context(|| format!("Failed to load {}", path.display()))
        }
    }
}
