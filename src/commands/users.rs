use anyhow::Result;

use ticketdesk::HelpDesk;

use super::{print_json, Output};

pub fn run(desk: &HelpDesk, out: Output) -> Result<()> {
    let users = desk.users()?;

    if out == Output::Json {
        return print_json(&users);
    }

    if users.is_empty() {
        println!("No users. Run 'ticketdesk init' to create the sample accounts.");
        return Ok(());
    }

    for user in users {
        println!("#{:<4} {:9} {:<20} {}", user.id, user.role, user.name, user.email);
    }
    Ok(())
}
