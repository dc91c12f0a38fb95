//! Find command - print records matching the filters

use anyhow::Result;
use pwstore_core::LogEvent;

use super::{get_logger, log_event, open_database, GlobalArgs};
use crate::output;

pub fn run(global: &GlobalArgs, account: &str, username: Option<&str>, json: bool) -> Result<()> {
    let logger = get_logger();
    let db = open_database(global, &logger, "find")?;

    let matches = db.find(account, username);
    log_event(
        &logger,
        LogEvent::new("find_completed")
            .with_command("find")
            .with_records(matches.len()),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    if matches.is_empty() {
        output::warning("No matching records.");
        return Ok(());
    }

    for record in matches {
        println!("{}", record);
    }

    Ok(())
}
