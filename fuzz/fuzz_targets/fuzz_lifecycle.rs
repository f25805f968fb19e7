#![no_main]

//! Fuzz target for the ticket state machine.
//!
//! Drives arbitrary update sequences (including malformed status/priority
//! strings and unknown admin ids) through the pure lifecycle functions and
//! checks the invariants that must survive any input: closed_at tracks the
//! closed status, created_at never moves, and only admins get updates through.

use arbitrary::Arbitrary;
use chrono::{Duration, TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

use ticketdesk::error::{ErrorKind, Result};
use ticketdesk::filter::{apply_filters, FilterParams};
use ticketdesk::lifecycle::{self, CreateTicketRequest, UpdateTicketRequest};
use ticketdesk::models::{Role, Status, Ticket, User};
use ticketdesk::stats::compute_stats;

#[derive(Arbitrary, Debug)]
struct Step {
    status: Option<String>,
    assigned_admin_id: Option<Option<i64>>,
    priority: Option<String>,
    as_admin: bool,
}

#[derive(Arbitrary, Debug)]
struct LifecycleInput {
    title: String,
    description: String,
    priority: String,
    steps: Vec<Step>,
    filter_status: Option<String>,
}

fn user(id: i64, role: Role) -> User {
    User {
        id,
        email: format!("u{}@example.com", id),
        name: format!("User {}", id),
        role,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

fn lookup(id: i64) -> Result<Option<User>> {
    Ok(match id {
        1 => Some(user(1, Role::Reporter)),
        3 | 4 => Some(user(id, Role::Admin)),
        _ => None,
    })
}

fuzz_target!(|input: LifecycleInput| {
    let reporter = user(1, Role::Reporter);
    let admin = user(3, Role::Admin);

    let req = CreateTicketRequest {
        title: input.title,
        description: input.description,
        priority: input.priority,
    };
    let new = match lifecycle::validate_new_ticket(&reporter, &req) {
        Ok(n) => n,
        Err(_) => return,
    };

    let created = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut ticket = Ticket {
        id: 1,
        title: new.title,
        description: new.description,
        priority: new.priority,
        status: Status::Open,
        category: None,
        reporter: reporter.clone(),
        assigned_admin: None,
        created_at: created,
        updated_at: created,
        closed_at: None,
    };

    let mut history = vec![ticket.clone()];
    for (i, step) in input.steps.into_iter().take(64).enumerate() {
        let as_admin = step.as_admin;
        let actor = if as_admin { &admin } else { &reporter };
        let req = UpdateTicketRequest {
            status: step.status,
            assigned_admin_id: step.assigned_admin_id,
            priority: step.priority,
        };
        let now = created + Duration::seconds(i as i64 + 1);
        match lifecycle::update_ticket(actor, ticket.clone(), &req, lookup, now) {
            Ok(updated) => {
                assert!(as_admin, "reporter update accepted: {:?}", req);
                if updated != ticket {
                    assert_eq!(updated.updated_at, now);
                }
                ticket = updated;
            }
            // Reporters are refused before any field is parsed; admins only
            // fail on bad input.
            Err(e) if as_admin => assert!(matches!(
                e.kind(),
                ErrorKind::ValidationError | ErrorKind::NotFound
            )),
            Err(e) => assert_eq!(e.kind(), ErrorKind::Unauthorized),
        }

        assert_eq!(ticket.closed_at.is_some(), ticket.status == Status::Closed);
        assert_eq!(ticket.created_at, created);
        if let Some(admin) = &ticket.assigned_admin {
            assert_eq!(admin.role, Role::Admin);
        }
        history.push(ticket.clone());
    }

    let stats = compute_stats(&history);
    assert_eq!(stats.status_breakdown.values().sum::<usize>(), stats.total);

    let params = FilterParams {
        status: input.filter_status,
        ..FilterParams::default()
    };
    if let Ok(spec) = params.parse() {
        let once = apply_filters(history.clone(), &spec);
        let twice = apply_filters(once.clone(), &spec);
        assert_eq!(once, twice);
    }
});
