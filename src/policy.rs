//! Role-scoped visibility and mutation rules.
//!
//! Reporters create tickets and read their own. Admins read everything and
//! are the only role allowed to change an existing ticket.

use crate::error::{Result, TicketError};
use crate::lifecycle::TicketChanges;
use crate::models::{Role, Ticket, User};

pub fn can_create(user: &User) -> bool {
    match user.role {
        Role::Reporter => true,
        Role::Admin => false,
    }
}

pub fn can_view(user: &User, ticket: &Ticket) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Reporter => ticket.reporter.id == user.id,
    }
}

/// Whether `user` may change tickets at all, before any ticket is loaded.
pub fn can_mutate_tickets(user: &User) -> bool {
    match user.role {
        Role::Admin => true,
        Role::Reporter => false,
    }
}

pub fn can_mutate(user: &User, _ticket: &Ticket, _changes: &TicketChanges) -> bool {
    // Ownership does not matter: a reporter cannot edit even their own ticket.
    can_mutate_tickets(user)
}

pub fn ensure_can_create(user: &User) -> Result<()> {
    if can_create(user) {
        Ok(())
    } else {
        Err(TicketError::unauthorized(format!(
            "User #{} ({}) may not create tickets",
            user.id, user.role
        )))
    }
}

pub fn ensure_can_view(user: &User, ticket: &Ticket) -> Result<()> {
    if can_view(user, ticket) {
        Ok(())
    } else {
        Err(TicketError::unauthorized(format!(
            "User #{} may not view ticket #{}",
            user.id, ticket.id
        )))
    }
}

pub fn ensure_can_mutate_tickets(user: &User) -> Result<()> {
    if can_mutate_tickets(user) {
        Ok(())
    } else {
        Err(TicketError::unauthorized(format!(
            "User #{} ({}) may not modify tickets",
            user.id, user.role
        )))
    }
}

pub fn ensure_can_mutate(user: &User, ticket: &Ticket, changes: &TicketChanges) -> Result<()> {
    if can_mutate(user, ticket, changes) {
        Ok(())
    } else {
        Err(TicketError::unauthorized(format!(
            "User #{} ({}) may not modify ticket #{}",
            user.id, user.role, ticket.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Priority, Status};
    use crate::test_support::{ticket, user};

    #[test]
    fn test_only_reporters_create() {
        assert!(can_create(&user(1, Role::Reporter)));
        assert!(!can_create(&user(3, Role::Admin)));
        let err = ensure_can_create(&user(3, Role::Admin)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_reporter_sees_only_own_tickets() {
        let alice = user(1, Role::Reporter);
        let bob = user(2, Role::Reporter);
        let own = ticket(10, &alice, Status::Open, Priority::Low);
        let other = ticket(11, &bob, Status::Open, Priority::Low);

        assert!(can_view(&alice, &own));
        assert!(!can_view(&alice, &other));
        assert!(ensure_can_view(&alice, &other).is_err());
    }

    #[test]
    fn test_admin_sees_everything() {
        let admin = user(3, Role::Admin);
        let alice = user(1, Role::Reporter);
        assert!(can_view(&admin, &ticket(10, &alice, Status::Closed, Priority::High)));
    }

    #[test]
    fn test_reporter_cannot_mutate_own_ticket() {
        let alice = user(1, Role::Reporter);
        let own = ticket(10, &alice, Status::Open, Priority::Low);
        let changes = TicketChanges {
            status: Some(Status::Closed),
            ..TicketChanges::default()
        };
        assert!(!can_mutate(&alice, &own, &changes));
        assert!(can_mutate(&user(3, Role::Admin), &own, &changes));
        let err = ensure_can_mutate(&alice, &own, &changes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
