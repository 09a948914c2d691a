//! API error handling
//!
//! Domain failures map onto HTTP statuses here so handlers can use `?`
//! throughout. Field-level validation failures keep their field names and
//! codes in the response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::{DeclarationId, PortError};
use domain_declarations::{DeclarationError, FieldError, FieldErrorCode, RuleViolation};
use domain_training::TrainingRecordError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("{reason}")]
    BusinessRule {
        rule: RuleViolation,
        reason: String,
    },

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        existing: Option<DeclarationId>,
    },

    /// A statement or line item is not in the shape the operation needs
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleViolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<DeclarationId>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) | ApiError::BusinessRule { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict { .. } | ApiError::Integrity(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Validation(_) => "validation_error",
            ApiError::BusinessRule { .. } => "business_rule",
            ApiError::Conflict { .. } => "conflict",
            ApiError::Integrity(_) => "integrity",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = ErrorResponse {
            error: self.error_type().to_string(),
            message: self.to_string(),
            details: None,
            rule: None,
            existing_id: None,
        };

        match self {
            ApiError::Validation(errors) => body.details = Some(errors),
            ApiError::BusinessRule { rule, .. } => body.rule = Some(rule),
            ApiError::Conflict { existing, .. } => body.existing_id = existing,
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

impl From<DeclarationError> for ApiError {
    fn from(err: DeclarationError) -> Self {
        match err {
            DeclarationError::Validation(errors) => ApiError::Validation(errors),
            DeclarationError::BusinessRule { rule, reason } => ApiError::BusinessRule { rule, reason },
            DeclarationError::Conflict { existing } => ApiError::Conflict {
                message: "An identical declaration was stored concurrently".to_string(),
                existing,
            },
            DeclarationError::Integrity { reason } => ApiError::Integrity(reason),
            err @ DeclarationError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DeclarationError::Store(err) => ApiError::from(err),
        }
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PortError::PreconditionFailed { message } => ApiError::Conflict { message, existing: None },
            err if err.is_transient() => {
                error!(error = %err, "Store unavailable");
                ApiError::Unavailable("The declaration store is unavailable".to_string())
            }
            err => {
                error!(error = %err, "Store failure");
                ApiError::Internal("Unexpected store failure".to_string())
            }
        }
    }
}

impl From<TrainingRecordError> for ApiError {
    fn from(err: TrainingRecordError) -> Self {
        let field = match err {
            TrainingRecordError::SchoolAndDeliveryPartner => "school_id",
            TrainingRecordError::ForeignInductionRecord { .. } => "induction_record",
        };
        ApiError::Validation(vec![FieldError::new(field, FieldErrorCode::InvalidValue, err.to_string())])
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| {
                    let code = if e.code == "required" {
                        FieldErrorCode::Missing
                    } else {
                        FieldErrorCode::InvalidValue
                    };
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"));
                    FieldError::new(field.clone(), code, message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::Validation(fields)
    }
}
