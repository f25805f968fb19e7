use anyhow::{bail, Result};

use ticketdesk::lifecycle::UpdateTicketRequest;
use ticketdesk::HelpDesk;

use super::{print_json, Output};

pub struct UpdateArgs<'a> {
    pub status: Option<&'a str>,
    pub assign: Option<i64>,
    pub unassign: bool,
    pub priority: Option<&'a str>,
}

pub fn build_request(args: &UpdateArgs<'_>) -> Result<UpdateTicketRequest> {
    if args.assign.is_some() && args.unassign {
        bail!("Use either --assign or --unassign, not both");
    }

    let assigned_admin_id = match (args.assign, args.unassign) {
        (Some(id), _) => Some(Some(id)),
        (None, true) => Some(None),
        (None, false) => None,
    };

    Ok(UpdateTicketRequest {
        status: args.status.map(str::to_string),
        assigned_admin_id,
        priority: args.priority.map(str::to_string),
    })
}

pub fn run(desk: &HelpDesk, actor: i64, id: i64, args: &UpdateArgs<'_>, out: Output) -> Result<()> {
    let req = build_request(args)?;
    let ticket = desk.update_ticket(actor, id, &req)?;

    match out {
        Output::Json => print_json(&ticket)?,
        Output::Text => println!("Updated ticket #{}", ticket.id),
    }
    Ok(())
}
