//! Builders shared by unit tests.

use chrono::{TimeZone, Utc};

use crate::models::{Priority, Role, Status, Ticket, User};

pub fn user(id: i64, role: Role) -> User {
    User {
        id,
        email: format!("user{}@example.com", id),
        name: format!("User {}", id),
        role,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub fn ticket(id: i64, reporter: &User, status: Status, priority: Priority) -> Ticket {
    let created = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        + chrono::Duration::minutes(id);
    Ticket {
        id,
        title: format!("Ticket {}", id),
        description: "Something is wrong".to_string(),
        priority,
        status,
        category: None,
        reporter: reporter.clone(),
        assigned_admin: None,
        created_at: created,
        updated_at: created,
        closed_at: (status == Status::Closed).then_some(created),
    }
}
