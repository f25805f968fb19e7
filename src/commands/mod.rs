pub mod analyze;
pub mod create;
pub mod export;
pub mod init;
pub mod list;
pub mod show;
pub mod stats;
pub mod status;
pub mod update;
pub mod users;

use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};

use ticketdesk::models::Ticket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

/// One-line summary used by list-style output.
pub fn ticket_line(ticket: &Ticket) -> String {
    let status_display = format!("[{}]", ticket.status);
    let assignee = ticket
        .assigned_admin
        .as_ref()
        .map(|a| a.name.as_str())
        .unwrap_or("-");
    format!(
        "#{:<4} {:13} {:<40} {:8} {:<16} {}",
        ticket.id,
        status_display,
        truncate(&ticket.title, 40),
        ticket.priority,
        truncate(assignee, 16),
        ticket.created_at.format("%Y-%m-%d")
    )
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_truncate_short() {
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(truncate("a very long ticket title", 10), "a very ...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("日本語のタイトルです", 5), "日本...");
    }

    proptest! {
        #[test]
        fn prop_truncate_never_exceeds(s in "\\PC{0,80}", max in 4usize..60) {
            prop_assert!(truncate(&s, max).chars().count() <= max);
        }
    }
}
