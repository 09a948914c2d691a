//! Declaration domain errors
//!
//! Four kinds of failure reach callers: malformed input, broken domain
//! rules, concurrent identical submissions and structural problems with
//! statements. Storage failures pass through as [`PortError`].

use serde::Serialize;
use thiserror::Error;

use core_kernel::{DeclarationId, PortError};

/// Machine-readable code for a rejected field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorCode {
    Missing,
    InvalidFormat,
    InvalidValue,
    InvalidParticipant,
    InvalidForCourse,
    NotInSchedule,
    InFuture,
    EvidenceRequired,
}

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: FieldErrorCode,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: FieldErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

/// Which domain rule was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleViolation {
    DeclarationTooEarly,
    DeclarationTooLate,
    AlreadyTerminal,
    NotPaid,
    InvalidTransition,
    ParticipantNotFundable,
}

/// Errors returned by declaration, ledger and clawback operations
#[derive(Debug, Error)]
pub enum DeclarationError {
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("{reason}")]
    BusinessRule {
        rule: RuleViolation,
        reason: String,
    },

    /// A concurrent writer stored the same submission first
    #[error("An identical declaration was stored concurrently")]
    Conflict {
        existing: Option<DeclarationId>,
    },

    /// Structural failure; the surrounding operation was not applied
    #[error("{reason}")]
    Integrity {
        reason: String,
    },

    #[error("{entity} {id} not found")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    #[error(transparent)]
    Store(#[from] PortError),
}

impl DeclarationError {
    pub fn field(field: impl Into<String>, code: FieldErrorCode, message: impl Into<String>) -> Self {
        DeclarationError::Validation(vec![FieldError::new(field, code, message)])
    }

    pub fn rule(rule: RuleViolation, reason: impl Into<String>) -> Self {
        DeclarationError::BusinessRule {
            rule,
            reason: reason.into(),
        }
    }

    pub fn integrity(reason: impl Into<String>) -> Self {
        DeclarationError::Integrity {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        DeclarationError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DeclarationError::Validation(_))
    }

    pub fn is_business_rule(&self) -> bool {
        matches!(self, DeclarationError::BusinessRule { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DeclarationError::Conflict { .. })
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, DeclarationError::Integrity { .. })
    }

    /// The broken rule, when this is a business-rule failure
    pub fn violation(&self) -> Option<RuleViolation> {
        match self {
            DeclarationError::BusinessRule { rule, .. } => Some(*rule),
            _ => None,
        }
    }

    /// Field errors, empty unless this is a validation failure
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            DeclarationError::Validation(errors) => errors,
            _ => &[],
        }
    }
}
