//! Output helpers shared by CLI commands.

use anyhow::Result;
use comfy_table::Table;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    println!("{output}");
    Ok(())
}

pub fn print_table(table: Table) -> Result<()> {
    println!("{table}");
    Ok(())
}
