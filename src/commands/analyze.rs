use anyhow::Result;

use ticketdesk::HelpDesk;

use super::{print_json, Output};

pub fn run(desk: &HelpDesk, actor: i64, id: i64, out: Output) -> Result<()> {
    let ticket = desk.analyze_ticket(actor, id)?;

    match out {
        Output::Json => print_json(&ticket)?,
        Output::Text => println!(
            "Ticket #{} categorized as: {}",
            ticket.id,
            ticket.category.as_deref().unwrap_or("-")
        ),
    }
    Ok(())
}
