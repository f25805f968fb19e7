//! Dashboard aggregates over an already authorized ticket collection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Priority, Status, Ticket};

pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    pub status_breakdown: BTreeMap<Status, usize>,
    pub priority_breakdown: BTreeMap<Priority, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub stats: Stats,
    pub recent: Vec<Ticket>,
}

/// Count tickets per status and priority. Every enum value gets a key,
/// including those with no tickets.
pub fn compute_stats(tickets: &[Ticket]) -> Stats {
    let mut status_breakdown: BTreeMap<Status, usize> =
        Status::ALL.into_iter().map(|s| (s, 0)).collect();
    let mut priority_breakdown: BTreeMap<Priority, usize> =
        Priority::ALL.into_iter().map(|p| (p, 0)).collect();

    for ticket in tickets {
        *status_breakdown.entry(ticket.status).or_default() += 1;
        *priority_breakdown.entry(ticket.priority).or_default() += 1;
    }

    Stats {
        total: tickets.len(),
        status_breakdown,
        priority_breakdown,
    }
}

/// The `limit` most recently created tickets, newest first.
pub fn recent_tickets(tickets: &[Ticket], limit: usize) -> Vec<Ticket> {
    let mut sorted: Vec<&Ticket> = tickets.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    sorted.into_iter().take(limit).cloned().collect()
}

pub fn dashboard(tickets: &[Ticket]) -> Dashboard {
    Dashboard {
        stats: compute_stats(tickets),
        recent: recent_tickets(tickets, RECENT_LIMIT),
    }
}
