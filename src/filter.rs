//! Multi-criteria ticket filtering.
//!
//! Filters are conjunctive, stable and idempotent. Role scoping is a
//! separate pass (`visible_to`) applied after the criteria.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TicketError};
use crate::models::{Priority, Status, Ticket, User};
use crate::policy;

pub const UNASSIGNED: &str = "unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminFilter {
    Unassigned,
    Admin(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub assigned_admin: Option<AdminFilter>,
    pub reporter: Option<i64>,
}

/// Raw, query-string shaped options. Missing and empty values are both
/// treated as "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assigned_admin: Option<String>,
    #[serde(default)]
    pub reporter: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(field: &str, value: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|_| TicketError::validation(format!("Invalid {} '{}'", field, value)))
}

impl FilterParams {
    pub fn parse(&self) -> Result<FilterSpec> {
        let status = non_empty(&self.status).map(str::parse::<Status>).transpose()?;
        let priority = non_empty(&self.priority)
            .map(str::parse::<Priority>)
            .transpose()?;
        let assigned_admin = match non_empty(&self.assigned_admin) {
            None => None,
            Some(UNASSIGNED) => Some(AdminFilter::Unassigned),
            Some(id) => Some(AdminFilter::Admin(parse_id("assigned_admin", id)?)),
        };
        let reporter = non_empty(&self.reporter)
            .map(|id| parse_id("reporter", id))
            .transpose()?;

        Ok(FilterSpec {
            status,
            priority,
            assigned_admin,
            reporter,
        })
    }
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self == &FilterSpec::default()
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        if let Some(status) = self.status {
            if ticket.status != status {
                return false;
            }
        }

        if let Some(priority) = self.priority {
            if ticket.priority != priority {
                return false;
            }
        }

        match self.assigned_admin {
            None => {}
            Some(AdminFilter::Unassigned) => {
                if ticket.assigned_admin.is_some() {
                    return false;
                }
            }
            Some(AdminFilter::Admin(id)) => {
                if ticket.assigned_admin_id() != Some(id) {
                    return false;
                }
            }
        }

        if let Some(reporter) = self.reporter {
            if ticket.reporter.id != reporter {
                return false;
            }
        }

        true
    }
}

pub fn apply_filters(tickets: Vec<Ticket>, spec: &FilterSpec) -> Vec<Ticket> {
    if spec.is_empty() {
        return tickets;
    }
    tickets.into_iter().filter(|t| spec.matches(t)).collect()
}

/// Drop every ticket `user` is not allowed to see.
pub fn visible_to(user: &User, tickets: Vec<Ticket>) -> Vec<Ticket> {
    tickets
        .into_iter()
        .filter(|t| policy::can_view(user, t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Role;
    use crate::test_support::{ticket, user};
    use proptest::prelude::*;

    fn ten_tickets() -> Vec<Ticket> {
        let alice = user(1, Role::Reporter);
        let bob = user(2, Role::Reporter);
        let statuses = [
            Status::Open,
            Status::InProgress,
            Status::Open,
            Status::Closed,
            Status::Open,
            Status::InProgress,
            Status::Open,
            Status::Closed,
            Status::InProgress,
            Status::Open,
        ];
        statuses
            .iter()
            .enumerate()
            .map(|(i, &status)| {
                let reporter = if i % 2 == 0 { &alice } else { &bob };
                let priority = Priority::ALL[i % 4];
                let mut t = ticket(i as i64 + 1, reporter, status, priority);
                if i % 3 == 0 {
                    t.assigned_admin = Some(user(3, Role::Admin));
                }
                t
            })
            .collect()
    }

    #[test]
    fn test_status_filter() {
        let spec = FilterSpec {
            status: Some(Status::Open),
            ..FilterSpec::default()
        };
        let result = apply_filters(ten_tickets(), &spec);
        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|t| t.status == Status::Open));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let spec = FilterSpec {
            status: Some(Status::Open),
            reporter: Some(1),
            ..FilterSpec::default()
        };
        let ids: Vec<i64> = apply_filters(ten_tickets(), &spec)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 3, 5, 7]);
    }

    #[test]
    fn test_unassigned_sentinel() {
        let unassigned = FilterSpec {
            assigned_admin: Some(AdminFilter::Unassigned),
            ..FilterSpec::default()
        };
        let assigned = FilterSpec {
            assigned_admin: Some(AdminFilter::Admin(3)),
            ..FilterSpec::default()
        };
        let a = apply_filters(ten_tickets(), &unassigned);
        let b = apply_filters(ten_tickets(), &assigned);
        assert_eq!(a.len() + b.len(), 10);
        assert!(a.iter().all(|t| t.assigned_admin.is_none()));
        assert!(b.iter().all(|t| t.assigned_admin_id() == Some(3)));
        assert!(apply_filters(
            ten_tickets(),
            &FilterSpec {
                assigned_admin: Some(AdminFilter::Admin(4)),
                ..FilterSpec::default()
            }
        )
        .is_empty());
    }

    #[test]
    fn test_params_parse() {
        let params = FilterParams {
            status: Some("in-progress".to_string()),
            priority: Some("".to_string()),
            assigned_admin: Some("unassigned".to_string()),
            reporter: Some("2".to_string()),
        };
        let spec = params.parse().unwrap();
        assert_eq!(spec.status, Some(Status::InProgress));
        assert_eq!(spec.priority, None);
        assert_eq!(spec.assigned_admin, Some(AdminFilter::Unassigned));
        assert_eq!(spec.reporter, Some(2));

        assert!(FilterParams::default().parse().unwrap().is_empty());
    }

    #[test]
    fn test_params_reject_malformed_values() {
        let bad_status = FilterParams {
            status: Some("done".to_string()),
            ..FilterParams::default()
        };
        assert_eq!(bad_status.parse().unwrap_err().kind(), ErrorKind::ValidationError);

        let bad_admin = FilterParams {
            assigned_admin: Some("nobody".to_string()),
            ..FilterParams::default()
        };
        assert_eq!(bad_admin.parse().unwrap_err().kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_visible_to() {
        let alice = user(1, Role::Reporter);
        let admin = user(3, Role::Admin);
        let mine = visible_to(&alice, ten_tickets());
        assert_eq!(mine.len(), 5);
        assert!(mine.iter().all(|t| t.reporter.id == 1));
        assert_eq!(visible_to(&admin, ten_tickets()).len(), 10);
    }

    #[test]
    fn test_matching_filter_never_widens_visibility() {
        let alice = user(1, Role::Reporter);
        let spec = FilterSpec {
            reporter: Some(2),
            ..FilterSpec::default()
        };
        let matched = apply_filters(ten_tickets(), &spec);
        assert_eq!(matched.len(), 5);
        assert!(visible_to(&alice, matched).is_empty());
    }

    fn arb_spec() -> impl Strategy<Value = FilterSpec> {
        (
            proptest::option::of(proptest::sample::select(Status::ALL.to_vec())),
            proptest::option::of(proptest::sample::select(Priority::ALL.to_vec())),
            proptest::option::of(prop_oneof![
                Just(AdminFilter::Unassigned),
                Just(AdminFilter::Admin(3)),
                Just(AdminFilter::Admin(4)),
            ]),
            proptest::option::of(1i64..=3),
        )
            .prop_map(|(status, priority, assigned_admin, reporter)| FilterSpec {
                status,
                priority,
                assigned_admin,
                reporter,
            })
    }

    proptest! {
        #[test]
        fn prop_filter_is_ordered_subset(spec in arb_spec()) {
            let input = ten_tickets();
            let output = apply_filters(input.clone(), &spec);

            // Every output ticket appears in the input, in the same relative order
            let mut cursor = input.iter();
            for t in &output {
                prop_assert!(cursor.any(|i| i.id == t.id));
                prop_assert!(spec.matches(t));
            }
        }

        #[test]
        fn prop_filter_is_idempotent(spec in arb_spec()) {
            let once = apply_filters(ten_tickets(), &spec);
            let twice = apply_filters(once.clone(), &spec);
            prop_assert_eq!(once, twice);
        }
    }
}
