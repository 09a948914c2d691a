//! Declaration DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{DeclarationId, ParticipantIdentityId, ParticipantProfileId, ProviderId};
use domain_declarations::{
    Cohort, CourseIdentifier, Declaration, DeclarationRequest, DeclarationState,
    DeclarationStateRecord, DeclarationType, EvidenceHeld, StateReason,
};

use crate::error::ApiError;

/// Body of `POST /api/v1/declarations`
///
/// Fields arrive as strings; the declaration service parses them so that
/// every rejection is reported against the field it came from.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateDeclarationBody {
    #[validate(required(message = "The participant_id is required"))]
    pub participant_id: Option<String>,
    #[validate(required(message = "The course_identifier is required"))]
    pub course_identifier: Option<String>,
    #[validate(required(message = "The declaration_type is required"))]
    pub declaration_type: Option<String>,
    /// RFC 3339 instant
    #[validate(required(message = "The declaration_date is required"))]
    pub declaration_date: Option<String>,
    pub evidence_held: Option<String>,
}

impl CreateDeclarationBody {
    pub fn into_request(self) -> Result<DeclarationRequest, ApiError> {
        self.validate()?;
        Ok(DeclarationRequest {
            participant_id: self.participant_id.unwrap_or_default(),
            course_identifier: self.course_identifier.unwrap_or_default(),
            declaration_type: self.declaration_type.unwrap_or_default(),
            declaration_date: self.declaration_date.unwrap_or_default(),
            evidence_held: self.evidence_held,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHistoryEntry {
    pub state: DeclarationState,
    pub reason: Option<StateReason>,
    pub created_at: DateTime<Utc>,
}

impl From<DeclarationStateRecord> for StateHistoryEntry {
    fn from(record: DeclarationStateRecord) -> Self {
        Self {
            state: record.state,
            reason: record.reason,
            created_at: record.created_at,
        }
    }
}

/// A declaration as returned to providers and finance users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationResponse {
    pub id: DeclarationId,
    /// The participant's identity, as providers know them
    pub participant_id: ParticipantIdentityId,
    pub participant_profile_id: ParticipantProfileId,
    pub provider_id: ProviderId,
    pub course_identifier: CourseIdentifier,
    pub declaration_type: DeclarationType,
    pub declaration_date: DateTime<Utc>,
    pub evidence_held: Option<EvidenceHeld>,
    pub cohort: Cohort,
    pub state: DeclarationState,
    pub superseded_by_id: Option<DeclarationId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<StateHistoryEntry>,
}

impl From<Declaration> for DeclarationResponse {
    fn from(declaration: Declaration) -> Self {
        Self {
            id: declaration.id,
            participant_id: declaration.participant_identity_id,
            participant_profile_id: declaration.participant_profile_id,
            provider_id: declaration.provider_id,
            course_identifier: declaration.course,
            declaration_type: declaration.declaration_type,
            declaration_date: declaration.declaration_date,
            evidence_held: declaration.evidence_held,
            cohort: declaration.cohort,
            state: declaration.state,
            superseded_by_id: declaration.superseded_by_id,
            created_at: declaration.created_at,
            updated_at: declaration.updated_at,
            history: declaration.history.into_iter().map(StateHistoryEntry::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_declarations::FieldErrorCode;

    #[test]
    fn test_missing_fields_are_reported_by_name() {
        let body = CreateDeclarationBody {
            participant_id: Some("PI-1".to_string()),
            ..Default::default()
        };

        match body.into_request() {
            Err(ApiError::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["course_identifier", "declaration_date", "declaration_type"]);
                assert!(fields.iter().all(|f| f.code == FieldErrorCode::Missing));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_complete_body_passes_through() {
        let body = CreateDeclarationBody {
            participant_id: Some("PI-1".to_string()),
            course_identifier: Some("ecf-induction".to_string()),
            declaration_type: Some("started".to_string()),
            declaration_date: Some("2021-10-01T09:00:00Z".to_string()),
            evidence_held: None,
        };

        let request = body.into_request().unwrap();
        assert_eq!(request.course_identifier, "ecf-induction");
        assert_eq!(request.evidence_held, None);
    }
}
