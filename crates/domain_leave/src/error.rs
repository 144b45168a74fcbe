//! Leave domain errors
//!
//! Every rejected request maps onto one of a small set of error kinds so
//! that the transport layer can answer consistently. Nothing is applied
//! when an error is returned.

use thiserror::Error;

use core_kernel::{DateRange, DaysError, LeaveEventId, PortError, TemporalError, YearMonth};
use crate::category::LeaveCategory;

/// Coarse classification of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or contextually invalid input
    Validation,
    /// Clashes with existing state (overlap, repeated transition)
    Conflict,
    /// Role, department, lock or signature rule failed
    Authorization,
    /// Unknown employee or event
    NotFound,
    /// Persistence failure
    Storage,
}

/// The authorization rule that rejected a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationFailure {
    #[error("{action} requires {required}")]
    RoleRequired {
        action: &'static str,
        required: &'static str,
    },

    #[error("actor of department '{actor_department}' cannot act on department '{department}'")]
    DepartmentMismatch {
        actor_department: String,
        department: String,
    },

    #[error("{department} schedule for {month} is confirmed; only a superadmin may change it")]
    MonthLocked {
        department: String,
        month: YearMonth,
    },

    #[error("a registered signature is required to confirm a month")]
    SignatureMissing,

    #[error("superadmin may not act on '{category}' entries")]
    ExemptCategory {
        category: LeaveCategory,
    },

    #[error("only the submitter or an administrator may {action}")]
    NotOwner {
        action: &'static str,
    },
}

/// Errors that can occur in the leave domain
#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{owner} already has a '{category}' entry on {range}")]
    Conflict {
        owner: String,
        category: LeaveCategory,
        range: DateRange,
        event_id: LeaveEventId,
    },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },

    #[error("{department} schedule for {month} is already confirmed")]
    AlreadyConfirmed {
        department: String,
        month: YearMonth,
    },

    #[error("Confirmation for {month} is only possible from {opens} to {closes}")]
    ConfirmationWindowClosed {
        month: YearMonth,
        opens: chrono::NaiveDate,
        closes: chrono::NaiveDate,
    },

    #[error("Not authorized: {0}")]
    Unauthorized(#[from] AuthorizationFailure),

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] PortError),

    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("{0}")]
    Days(#[from] DaysError),
}

impl LeaveError {
    /// Creates a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        LeaveError::Validation(message.into())
    }

    /// Creates a not-found error
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        LeaveError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LeaveError::Validation(_)
            | LeaveError::ConfirmationWindowClosed { .. }
            | LeaveError::Temporal(_)
            | LeaveError::Days(_) => ErrorKind::Validation,
            LeaveError::Conflict { .. }
            | LeaveError::InvalidTransition { .. }
            | LeaveError::AlreadyConfirmed { .. } => ErrorKind::Conflict,
            LeaveError::Unauthorized(_) => ErrorKind::Authorization,
            LeaveError::NotFound { .. } => ErrorKind::NotFound,
            LeaveError::Storage(PortError::NotFound { .. }) => ErrorKind::NotFound,
            LeaveError::Storage(PortError::StaleVersion { .. } | PortError::Conflict { .. }) => {
                ErrorKind::Conflict
            }
            LeaveError::Storage(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(LeaveError::validation("bad date").kind(), ErrorKind::Validation);
        assert_eq!(
            LeaveError::from(AuthorizationFailure::SignatureMissing).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(LeaveError::not_found("Employee", "EMP-1").kind(), ErrorKind::NotFound);
        assert_eq!(
            LeaveError::from(PortError::not_found("LeaveEvent", "LVE-1")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(LeaveError::from(PortError::internal("disk")).kind(), ErrorKind::Storage);
        assert_eq!(
            LeaveError::from(PortError::stale("Employee", "EMP-1")).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            LeaveError::from(PortError::conflict("duplicate event id")).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            LeaveError::from(DaysError::NotPositive("0".into())).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_month_locked_message_names_rule() {
        let err = LeaveError::from(AuthorizationFailure::MonthLocked {
            department: "surgery".to_string(),
            month: YearMonth::new(2024, 11).unwrap(),
        });
        assert!(err.to_string().contains("2024-11"));
        assert!(err.to_string().contains("superadmin"));
    }
}
