//! Support-ticket tracking core: lifecycle rules, role-scoped queries and
//! dashboard statistics over a SQLite-backed store.

pub mod categorize;
pub mod db;
pub mod desk;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod models;
pub mod policy;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use desk::HelpDesk;
pub use error::{ErrorKind, TicketError};
