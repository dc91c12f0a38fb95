//! Backups command - list rotated generations of the database

use anyhow::Result;
use pwstore_core::services::rotation;

use super::{load_config, GlobalArgs};
use crate::output;

pub fn run(global: &GlobalArgs, json: bool) -> Result<()> {
    // Listing needs neither the passphrase nor the lock
    let config = load_config(global)?;
    let path = config.database_path()?;
    let backups = rotation::list_backups(&path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&backups)?);
        return Ok(());
    }

    if backups.is_empty() {
        println!("No backups found for {}.", path.display());
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Generation", "Name", "Modified", "Size"]);

    for backup in &backups {
        table.add_row(vec![
            backup.generation.to_string(),
            backup.name.clone(),
            backup.modified_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            backup.size_display(),
        ]);
    }

    println!("{}", table);
    output::info(&format!(
        "Keeping up to {} generation(s)",
        config.backup_count()
    ));

    Ok(())
}
