use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 50;

/// Returned by the enum `FromStr` impls; carries the rejected input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {} '{}'", self.field, self.value)
    }
}

impl std::error::Error for UnknownValue {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reporter,
    Admin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Reporter, Role::Admin];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Reporter => "reporter",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

/// Ticket workflow state. Any state may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "closed")]
    Closed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Open, Status::InProgress, Status::Closed];

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in-progress",
            Status::Closed => "closed",
        }
    }
}

macro_rules! wire_enum {
    ($ty:ty, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| UnknownValue {
                        field: $field,
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_enum!(Role, "role");
wire_enum!(Priority, "priority");
wire_enum!(Status, "status");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub category: Option<String>,
    pub reporter: User,
    pub assigned_admin: Option<User>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn assigned_admin_id(&self) -> Option<i64> {
        self.assigned_admin.as_ref().map(|a| a.id)
    }
}

/// A validated, not yet stored ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

pub fn is_valid_priority(priority: &str) -> bool {
    priority.parse::<Priority>().is_ok()
}

pub fn is_valid_status(status: &str) -> bool {
    status.parse::<Status>().is_ok()
}

/// Non-blank after trimming and at most `max_len` characters (not bytes).
pub fn is_non_empty_bounded(s: &str, max_len: usize) -> bool {
    let trimmed = s.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= max_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_wire_strings() {
        assert_eq!(Status::InProgress.to_string(), "in-progress");
        assert_eq!("in-progress".parse::<Status>().unwrap(), Status::InProgress);
        assert_eq!("critical".parse::<Priority>().unwrap(), Priority::Critical);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn test_serde_matches_display() {
        for status in Status::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        for priority in Priority::ALL {
            let json = serde_json::to_string(&priority).unwrap();
            assert_eq!(json, format!("\"{}\"", priority));
        }
        let role: Role = serde_json::from_str("\"reporter\"").unwrap();
        assert_eq!(role, Role::Reporter);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(!is_valid_priority("urgent"));
        assert!(!is_valid_priority("High"));
        assert!(!is_valid_status("in_progress"));
        assert!(!is_valid_status(""));
        let err = "done".parse::<Status>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid status 'done'");
    }

    #[test]
    fn test_non_empty_bounded() {
        assert!(is_non_empty_bounded("Login broken", MAX_TITLE_LEN));
        assert!(!is_non_empty_bounded("", MAX_TITLE_LEN));
        assert!(!is_non_empty_bounded("   \t\n", MAX_TITLE_LEN));
        assert!(is_non_empty_bounded(&"a".repeat(200), MAX_TITLE_LEN));
        assert!(!is_non_empty_bounded(&"a".repeat(201), MAX_TITLE_LEN));
        // Counted in characters, not bytes
        assert!(is_non_empty_bounded(&"é".repeat(200), MAX_TITLE_LEN));
    }

    proptest! {
        #[test]
        fn prop_priority_roundtrip(priority in "low|medium|high|critical") {
            prop_assert!(is_valid_priority(&priority));
            let parsed: Priority = priority.parse().unwrap();
            prop_assert_eq!(parsed.as_str(), priority.as_str());
        }

        #[test]
        fn prop_unknown_status_rejected(
            status in "[a-z-]{1,12}"
                .prop_filter("Exclude valid statuses", |s| {
                    !["open", "in-progress", "closed"].contains(&s.as_str())
                })
        ) {
            prop_assert!(!is_valid_status(&status));
        }
    }
}
