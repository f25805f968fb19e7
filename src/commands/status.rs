use anyhow::Result;

use ticketdesk::HelpDesk;

use super::{print_json, Output};

pub fn close(desk: &HelpDesk, actor: i64, id: i64, out: Output) -> Result<()> {
    let ticket = desk.close_ticket(actor, id)?;
    match out {
        Output::Json => print_json(&ticket)?,
        Output::Text => println!("Closed ticket #{}", id),
    }
    Ok(())
}

pub fn reopen(desk: &HelpDesk, actor: i64, id: i64, out: Output) -> Result<()> {
    let ticket = desk.reopen_ticket(actor, id)?;
    match out {
        Output::Json => print_json(&ticket)?,
        Output::Text => println!("Reopened ticket #{}", id),
    }
    Ok(())
}
