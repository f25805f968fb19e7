//! Failure taxonomy shared by every ticket operation.
//!
//! All variants are recoverable. `Validation` and `Unauthorized` are raised
//! before any write, so the store is left untouched when they occur.

use serde::Serialize;
use thiserror::Error;

use crate::categorize::CategorizeError;
use crate::models::UnknownValue;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{entity} #{id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Analysis failed: {0}")]
    AnalysisFailed(#[from] CategorizeError),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    Unauthorized,
    NotFound,
    AnalysisFailed,
    StorageError,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AnalysisFailed => "analysis_failed",
            ErrorKind::StorageError => "storage_error",
        }
    }
}

impl TicketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TicketError::Validation(_) => ErrorKind::ValidationError,
            TicketError::Unauthorized(_) => ErrorKind::Unauthorized,
            TicketError::NotFound { .. } => ErrorKind::NotFound,
            TicketError::AnalysisFailed(_) => ErrorKind::AnalysisFailed,
            TicketError::Storage(_) => ErrorKind::StorageError,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        TicketError::Validation(msg.into())
    }

    pub(crate) fn unauthorized(msg: impl Into<String>) -> Self {
        TicketError::Unauthorized(msg.into())
    }

    pub(crate) fn ticket_not_found(id: i64) -> Self {
        TicketError::NotFound {
            entity: "Ticket",
            id,
        }
    }

    pub(crate) fn user_not_found(id: i64) -> Self {
        TicketError::NotFound { entity: "User", id }
    }
}

impl From<UnknownValue> for TicketError {
    fn from(err: UnknownValue) -> Self {
        TicketError::Validation(err.to_string())
    }
}

pub type Result<T, E = TicketError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            TicketError::validation("Title is required"),
            TicketError::unauthorized("Only admins may update tickets"),
            TicketError::ticket_not_found(7),
            TicketError::AnalysisFailed(CategorizeError::NotConfigured),
        ];
        let kinds: Vec<&str> = errors.iter().map(|e| e.kind().as_str()).collect();
        assert_eq!(
            kinds,
            ["validation_error", "unauthorized", "not_found", "analysis_failed"]
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(TicketError::ticket_not_found(7).to_string(), "Ticket #7 not found");
        assert_eq!(TicketError::user_not_found(3).to_string(), "User #3 not found");
        let err: TicketError = "urgent".parse::<crate::models::Priority>().unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.to_string(), "Invalid priority 'urgent'");
    }
}
