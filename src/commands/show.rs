use anyhow::Result;

use ticketdesk::HelpDesk;

use super::{print_json, Output};

pub fn run(desk: &HelpDesk, actor: i64, id: i64, out: Output) -> Result<()> {
    let ticket = desk.get_ticket(actor, id)?;

    if out == Output::Json {
        return print_json(&ticket);
    }

    println!("Ticket #{}: {}", ticket.id, ticket.title);
    println!("Status: {}", ticket.status);
    println!("Priority: {}", ticket.priority);
    println!("Reporter: {} <{}>", ticket.reporter.name, ticket.reporter.email);
    match &ticket.assigned_admin {
        Some(admin) => println!("Assigned: {} <{}>", admin.name, admin.email),
        None => println!("Assigned: (unassigned)"),
    }
    if let Some(category) = &ticket.category {
        println!("Category: {}", category);
    }
    println!("Created: {}", ticket.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", ticket.updated_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(closed) = ticket.closed_at {
        println!("Closed: {}", closed.format("%Y-%m-%d %H:%M:%S"));
    }

    println!("\nDescription:");
    for line in ticket.description.lines() {
        println!("  {}", line);
    }

    Ok(())
}
