//! pwstore CLI - encrypted passwords in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};

mod commands;
mod output;

use commands::{backups, find, logs, set, GlobalArgs};

/// pw - look up and store passwords in a GnuPG-encrypted file
#[derive(Parser)]
#[command(name = "pw", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    // `pw <account> [username]` is shorthand for `pw find`
    #[command(flatten)]
    query: QueryArgs,

    #[command(flatten)]
    global: GlobalOptions,
}

#[derive(Args)]
struct QueryArgs {
    /// Account filter (case-insensitive substring)
    account: Option<String>,
    /// Username filter (case-insensitive substring)
    username: Option<String>,
}

#[derive(Args)]
struct GlobalOptions {
    /// Path to the encrypted database [default: ~/passwds.gpg]
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Number of backup generations to keep on save [default: 5]
    #[arg(long, short = 'b', global = true)]
    backups: Option<usize>,
    /// GnuPG identity the database is encrypted to
    #[arg(long, short = 'r', global = true)]
    recipient: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show records matching the filters
    Find {
        /// Account filter (case-insensitive substring)
        account: String,
        /// Username filter (case-insensitive substring)
        username: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the password of a record, adding it if nothing matches
    Set {
        /// Account filter; also the account name of a new record
        account: String,
        /// Username filter; also the username of a new record
        username: Option<String>,
    },

    /// List rotated backups of the database
    Backups {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if is_recoverable(&e) {
                output::warning(&format!("{:#}", e));
            } else {
                output::error(&format!("{:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

/// Whether the failure left the database untouched and only needs a
/// narrower query, as opposed to a broken database or environment
fn is_recoverable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<pwstore_core::Error>()
        .is_some_and(pwstore_core::Error::is_recoverable)
}

fn run(cli: Cli) -> Result<()> {
    let global = GlobalArgs {
        db: cli.global.db,
        backups: cli.global.backups,
        recipient: cli.global.recipient,
    };

    match cli.command {
        Some(Commands::Find { account, username, json }) => {
            find::run(&global, &account, username.as_deref(), json)
        }
        Some(Commands::Set { account, username }) => set::run(&global, &account, username.as_deref()),
        Some(Commands::Backups { json }) => backups::run(&global, json),
        Some(Commands::Logs { command }) => logs::run(command),
        None => match cli.query.account {
            Some(account) => find::run(&global, &account, cli.query.username.as_deref(), false),
            None => Cli::command()
                .error(ErrorKind::MissingRequiredArgument, "an account filter is required")
                .exit(),
        },
    }
}
