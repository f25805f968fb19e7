use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use ticketdesk::filter::FilterSpec;
use ticketdesk::models::Ticket;
use ticketdesk::HelpDesk;

use super::print_json;

const EXPORT_VERSION: i32 = 1;

#[derive(Serialize, Deserialize)]
pub struct ExportData {
    pub version: i32,
    pub exported_at: String,
    pub exported_by: i64,
    pub tickets: Vec<Ticket>,
}

/// Dump every ticket the caller may see as JSON, to a file or stdout.
pub fn run_json(desk: &HelpDesk, actor: i64, output_path: Option<&str>) -> Result<()> {
    let tickets = desk.list_tickets(actor, &FilterSpec::default())?;

    let data = ExportData {
        version: EXPORT_VERSION,
        exported_at: chrono::Utc::now().to_rfc3339(),
        exported_by: actor,
        tickets,
    };

    match output_path {
        Some(path) => {
            let json = serde_json::to_string_pretty(&data)?;
            fs::write(path, json).context("Failed to write export file")?;
            eprintln!("Exported {} tickets to {}", data.tickets.len(), path);
        }
        None => print_json(&data)?,
    }
    Ok(())
}
