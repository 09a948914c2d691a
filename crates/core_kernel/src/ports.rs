//! Ports and Adapters Infrastructure
//!
//! Domains define port traits that extend the marker traits here; adapters
//! (PostgreSQL, in-memory) implement them. All adapters report failures
//! through [`PortError`] so domain services can tell a uniqueness collision
//! from a lost compare-and-set or a broken connection.
//!
//! ```text
//!   lifecycle / ledger / clawback services
//!                  │
//!                  ▼
//!         DeclarationStore port
//!            ▲            ▲
//!   PostgreSQL adapter   in-memory adapter
//! ```

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Error type for port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// The adapter refused a value, such as a foreign key to a missing row
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// A storage-layer uniqueness constraint rejected the write
    #[error("Unique constraint {constraint} violated: {message}")]
    UniqueViolation {
        constraint: String,
        message: String,
    },

    /// A compare-and-set precondition no longer held when the write landed
    #[error("Precondition failed: {message}")]
    PreconditionFailed {
        message: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
        }
    }

    pub fn unique_violation(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        PortError::UniqueViolation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        PortError::PreconditionFailed {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    /// Returns true if `constraint` is the uniqueness constraint that fired
    pub fn violates(&self, constraint: &str) -> bool {
        matches!(self, PortError::UniqueViolation { constraint: c, .. } if c == constraint)
    }
}

/// Marker trait for all domain ports
///
/// All port traits should extend this marker to ensure they are
/// thread-safe and can be used in async contexts.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    pub fn is_healthy(&self) -> bool {
        self.status == AdapterHealth::Healthy
    }
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_not_found() {
        let error = PortError::not_found("Declaration", "123");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert!(error.to_string().contains("Declaration"));
    }

    #[test]
    fn test_unique_violation_names_constraint() {
        let error = PortError::unique_violation("submission_key", "duplicate key value");
        assert!(error.violates("submission_key"));
        assert!(!error.violates("live_scope_key"));
        assert!(!PortError::connection("down").violates("submission_key"));
    }

    #[test]
    fn test_connection_errors_are_transient() {
        assert!(PortError::connection("reset by peer").is_transient());
        assert!(!PortError::validation("bad").is_transient());
    }
}
