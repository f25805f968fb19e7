use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use ticketdesk::categorize::Categorizer;
use ticketdesk::db::Database;
use ticketdesk::lifecycle::CreateTicketRequest;
use ticketdesk::models::{Role, User};
use ticketdesk::HelpDesk;

pub const DIR_NAME: &str = ".ticketdesk";
pub const DB_FILE: &str = "tickets.db";

const SAMPLE_USERS: [(&str, &str, Role); 4] = [
    ("reporter1@example.com", "John Reporter", Role::Reporter),
    ("reporter2@example.com", "Jane User", Role::Reporter),
    ("admin1@example.com", "Admin Smith", Role::Admin),
    ("admin2@example.com", "Support Manager", Role::Admin),
];

/// (reporter index into SAMPLE_USERS, title, description, priority)
const SAMPLE_TICKETS: [(usize, &str, &str, &str); 4] = [
    (
        0,
        "Cannot login to my account",
        "I keep getting an error message when trying to log in. \
         It says invalid credentials but I am sure my password is correct.",
        "high",
    ),
    (
        1,
        "Website loading very slowly",
        "The website takes more than 30 seconds to load any page. \
         This is affecting my productivity.",
        "medium",
    ),
    (
        0,
        "Feature request: Dark mode",
        "It would be great if the application had a dark mode option for better user experience.",
        "low",
    ),
    (
        1,
        "Critical bug in payment system",
        "Payments are failing with error code 500. This is affecting our business operations.",
        "critical",
    ),
];

pub fn run(path: &Path, seed: bool, categorizer: Box<dyn Categorizer>) -> Result<()> {
    let desk_dir = path.join(DIR_NAME);
    let db_path = desk_dir.join(DB_FILE);

    if db_path.exists() {
        println!("Already initialized at {}", desk_dir.display());
        return Ok(());
    }

    fs::create_dir_all(&desk_dir).context("Failed to create .ticketdesk directory")?;
    let db = Database::open(&db_path)?;
    println!("Created {}", desk_dir.display());

    if seed {
        let desk = HelpDesk::new(db, categorizer);
        let users = seed_users(&desk)?;
        let tickets = seed_tickets(&desk, &users)?;
        println!("Seeded {} users and {} tickets", users.len(), tickets);
    }

    Ok(())
}

/// Walk up from `start` looking for an initialized store.
pub fn find_db_path(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(DIR_NAME).join(DB_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Insert the sample accounts unless the user table already has rows.
pub fn seed_users(desk: &HelpDesk) -> Result<Vec<User>> {
    let existing = desk.users()?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    SAMPLE_USERS
        .iter()
        .map(|(email, name, role)| {
            desk.database()
                .create_user(email, name, *role)
                .with_context(|| format!("Failed to create user {}", email))
        })
        .collect()
}

fn seed_tickets(desk: &HelpDesk, users: &[User]) -> Result<usize> {
    for (reporter, title, description, priority) in SAMPLE_TICKETS {
        let req = CreateTicketRequest {
            title: title.to_string(),
            description: description.to_string(),
            priority: priority.to_string(),
        };
        desk.create_ticket(users[reporter].id, &req)
            .with_context(|| format!("Failed to create sample ticket '{}'", title))?;
    }
    Ok(SAMPLE_TICKETS.len())
}
