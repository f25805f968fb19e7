//! Ticket creation and the status/assignment state machine.
//!
//! Every function here is pure: callers load the ticket, hand it in together
//! with a user lookup, and persist whatever comes back. Nothing is returned
//! until every requested change has been validated, so a failed update never
//! yields a half-modified ticket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, TicketError};
use crate::models::{
    is_non_empty_bounded, NewTicket, Priority, Role, Status, Ticket, User, MAX_CATEGORY_LEN,
    MAX_TITLE_LEN,
};
use crate::policy;

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
    pub priority: String,
}

/// Body of an update request. `assigned_admin_id` is tri-state: absent
/// leaves the assignment alone, `null` clears it, a number sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTicketRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_admin_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

fn double_option<'de, D, T>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

impl UpdateTicketRequest {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assigned_admin_id.is_none() && self.priority.is_none()
    }
}

/// A fully validated set of field changes, applied all at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketChanges {
    pub status: Option<Status>,
    pub assigned_admin: Option<Option<User>>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
}

impl TicketChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.assigned_admin.is_none()
            && self.priority.is_none()
            && self.category.is_none()
    }
}

/// Check `actor` may file a ticket and normalize the request.
pub fn validate_new_ticket(actor: &User, req: &CreateTicketRequest) -> Result<NewTicket> {
    policy::ensure_can_create(actor)?;

    if !is_non_empty_bounded(&req.title, MAX_TITLE_LEN) {
        if req.title.trim().is_empty() {
            return Err(TicketError::validation("Title is required"));
        }
        return Err(TicketError::validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    if req.description.trim().is_empty() {
        return Err(TicketError::validation("Description is required"));
    }
    let priority: Priority = req.priority.parse()?;

    Ok(NewTicket {
        title: req.title.trim().to_string(),
        description: req.description.trim().to_string(),
        priority,
    })
}

/// Validate the request fields, resolving any admin id through `lookup_user`.
pub fn parse_changes<F>(req: &UpdateTicketRequest, mut lookup_user: F) -> Result<TicketChanges>
where
    F: FnMut(i64) -> Result<Option<User>>,
{
    if req.is_empty() {
        return Err(TicketError::validation(
            "Nothing to update. Use status, assigned_admin_id, or priority",
        ));
    }

    let status = req.status.as_deref().map(str::parse::<Status>).transpose()?;
    let priority = req
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()?;

    let assigned_admin = match req.assigned_admin_id {
        None => None,
        Some(None) => Some(None),
        Some(Some(admin_id)) => {
            let user = lookup_user(admin_id)?.ok_or_else(|| TicketError::user_not_found(admin_id))?;
            if user.role != Role::Admin {
                return Err(TicketError::validation(format!(
                    "User #{} is not an admin and cannot be assigned",
                    admin_id
                )));
            }
            Some(Some(user))
        }
    };

    Ok(TicketChanges {
        status,
        assigned_admin,
        priority,
        category: None,
    })
}

/// Move `ticket` to `status`, keeping `closed_at` in step. Returns whether
/// anything changed; a self-transition is a no-op.
pub fn transition(ticket: &mut Ticket, status: Status, now: DateTime<Utc>) -> bool {
    if ticket.status == status {
        return false;
    }
    ticket.closed_at = match status {
        Status::Closed => Some(now),
        Status::Open | Status::InProgress => None,
    };
    ticket.status = status;
    true
}

/// Apply already validated changes. Cannot fail.
pub fn apply_changes(ticket: &mut Ticket, changes: TicketChanges, now: DateTime<Utc>) -> bool {
    let mut changed = false;

    if let Some(status) = changes.status {
        changed |= transition(ticket, status, now);
    }

    if let Some(admin) = changes.assigned_admin {
        if ticket.assigned_admin_id() != admin.as_ref().map(|a| a.id) {
            ticket.assigned_admin = admin;
            changed = true;
        }
    }

    if let Some(priority) = changes.priority {
        if ticket.priority != priority {
            ticket.priority = priority;
            changed = true;
        }
    }

    if let Some(category) = changes.category {
        if ticket.category.as_deref() != Some(category.as_str()) {
            ticket.category = Some(category);
            changed = true;
        }
    }

    if changed {
        ticket.updated_at = now;
    }
    changed
}

/// The full update path: authorize, validate, then apply.
///
/// On error `ticket` is dropped untouched and the caller must not persist
/// anything.
pub fn update_ticket<F>(
    actor: &User,
    mut ticket: Ticket,
    req: &UpdateTicketRequest,
    lookup_user: F,
    now: DateTime<Utc>,
) -> Result<Ticket>
where
    F: FnMut(i64) -> Result<Option<User>>,
{
    policy::ensure_can_mutate_tickets(actor)?;
    let changes = parse_changes(req, lookup_user)?;
    policy::ensure_can_mutate(actor, &ticket, &changes)?;
    apply_changes(&mut ticket, changes, now);
    Ok(ticket)
}

/// Write a categorizer result back through the same path as [`update_ticket`].
pub fn record_category(
    actor: &User,
    mut ticket: Ticket,
    category: &str,
    now: DateTime<Utc>,
) -> Result<Ticket> {
    let category = category.trim();
    if !is_non_empty_bounded(category, MAX_CATEGORY_LEN) {
        return Err(TicketError::validation(format!(
            "Category must be 1-{} characters",
            MAX_CATEGORY_LEN
        )));
    }
    let changes = TicketChanges {
        category: Some(category.to_string()),
        ..TicketChanges::default()
    };
    policy::ensure_can_mutate(actor, &ticket, &changes)?;
    apply_changes(&mut ticket, changes, now);
    Ok(ticket)
}
