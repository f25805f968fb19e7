use anyhow::Result;

use ticketdesk::lifecycle::CreateTicketRequest;
use ticketdesk::HelpDesk;

use super::{print_json, Output};

pub fn run(
    desk: &HelpDesk,
    actor: i64,
    title: &str,
    description: &str,
    priority: &str,
    out: Output,
) -> Result<()> {
    let req = CreateTicketRequest {
        title: title.to_string(),
        description: description.to_string(),
        priority: priority.to_string(),
    };
    let ticket = desk.create_ticket(actor, &req)?;

    match out {
        Output::Json => print_json(&ticket)?,
        Output::Text => println!("Created ticket #{}", ticket.id),
    }
    Ok(())
}
