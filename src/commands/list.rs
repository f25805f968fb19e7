use anyhow::Result;

use ticketdesk::filter::FilterParams;
use ticketdesk::HelpDesk;

use super::{print_json, ticket_line, Output};

pub fn run(desk: &HelpDesk, actor: i64, params: &FilterParams, out: Output) -> Result<()> {
    let spec = params.parse()?;
    let tickets = desk.list_tickets(actor, &spec)?;

    if out == Output::Json {
        return print_json(&tickets);
    }

    if tickets.is_empty() {
        println!("No tickets found.");
        return Ok(());
    }

    for ticket in &tickets {
        println!("{}", ticket_line(ticket));
    }

    Ok(())
}
