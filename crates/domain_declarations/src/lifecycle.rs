//! Declaration lifecycle service
//!
//! Entry point for provider submissions. Creation validates the request,
//! resolves duplicates and settles the initial state in one change set, so
//! a declaration is never observed in a state it will later be flipped out
//! of by another writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{Clock, DeclarationId, ParticipantIdentityId, PortError, ProviderId, WindowPosition};

use crate::changeset::{ChangeSet, CommitMode};
use crate::course::{CourseIdentifier, DeclarationType, EvidenceHeld};
use crate::declaration::{Declaration, DeclarationDraft, DeclarationState, InitialState};
use crate::duplicates;
use crate::error::{DeclarationError, FieldError, FieldErrorCode, RuleViolation};
use crate::ledger::Ledger;
use crate::line_item::LineItemIntent;
use crate::ports::{constraints, DeclarationStore, ParticipantDirectory};

/// Attempts made when a concurrent writer takes the surviving slot first
const MAX_ATTEMPTS: usize = 3;

/// A provider's declaration as submitted, before any parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRequest {
    pub participant_id: String,
    pub course_identifier: String,
    pub declaration_type: String,
    /// RFC 3339 instant
    pub declaration_date: String,
    #[serde(default)]
    pub evidence_held: Option<String>,
}

/// Result of a create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationReceipt {
    pub declaration: Declaration,
    /// False when an identical declaration already existed
    pub created: bool,
}

struct ParsedRequest {
    participant_id: ParticipantIdentityId,
    course: CourseIdentifier,
    declaration_type: DeclarationType,
    declaration_date: DateTime<Utc>,
    evidence_held: Option<EvidenceHeld>,
}

pub struct DeclarationService {
    store: Arc<dyn DeclarationStore>,
    directory: Arc<dyn ParticipantDirectory>,
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

impl DeclarationService {
    pub fn new(
        store: Arc<dyn DeclarationStore>,
        directory: Arc<dyn ParticipantDirectory>,
        ledger: Arc<Ledger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, directory, ledger, clock }
    }

    pub async fn get_declaration(&self, id: DeclarationId) -> Result<Declaration, DeclarationError> {
        self.store
            .get_declaration(id)
            .await?
            .ok_or_else(|| DeclarationError::not_found("Declaration", id))
    }

    /// Records a milestone claim
    ///
    /// Resubmitting an identical claim returns the stored declaration with
    /// `created = false`. A claim for a milestone already declared for the
    /// same person is stored as an ineligible duplicate of the original.
    #[instrument(skip(self, request), fields(provider_id = %provider_id))]
    pub async fn create_declaration(
        &self,
        provider_id: ProviderId,
        request: &DeclarationRequest,
    ) -> Result<DeclarationReceipt, DeclarationError> {
        let parsed = parse_request(request)?;
        let now = self.clock.now();

        if parsed.declaration_date > now {
            return Err(DeclarationError::field(
                "declaration_date",
                FieldErrorCode::InFuture,
                "The declaration date cannot be in the future",
            ));
        }

        let profile = self
            .directory
            .resolve_participant(parsed.participant_id, provider_id, parsed.course)
            .await?
            .ok_or_else(|| {
                DeclarationError::field(
                    "participant_id",
                    FieldErrorCode::InvalidParticipant,
                    "The participant is not enrolled on this course with this provider",
                )
            })?;

        if !parsed.course.accepts(parsed.declaration_type) {
            return Err(DeclarationError::field(
                "declaration_type",
                FieldErrorCode::InvalidForCourse,
                format!(
                    "{} is not a valid declaration type for {}",
                    parsed.declaration_type, parsed.course
                ),
            ));
        }

        if parsed.course.requires_evidence(parsed.declaration_type) && parsed.evidence_held.is_none() {
            return Err(DeclarationError::field(
                "evidence_held",
                FieldErrorCode::EvidenceRequired,
                format!("Evidence must be given for a {} declaration", parsed.declaration_type),
            ));
        }

        let schedule = self
            .directory
            .schedule(profile.schedule_id, profile.cohort)
            .await?;
        let milestone = schedule
            .as_ref()
            .and_then(|s| s.milestone_for(parsed.declaration_type))
            .cloned()
            .ok_or_else(|| {
                DeclarationError::field(
                    "declaration_type",
                    FieldErrorCode::NotInSchedule,
                    format!(
                        "The participant's schedule has no {} milestone",
                        parsed.declaration_type
                    ),
                )
            })?;

        let draft = DeclarationDraft {
            participant_profile_id: profile.id,
            participant_identity_id: profile.identity_id,
            provider_id,
            course: parsed.course,
            declaration_type: parsed.declaration_type,
            declaration_date: parsed.declaration_date,
            evidence_held: parsed.evidence_held,
            cohort: profile.cohort,
        };

        for attempt in 1..=MAX_ATTEMPTS {
            if let Some(existing) = self.store.find_submission(&draft.submission_key()).await? {
                debug!(declaration_id = %existing.id, "identical declaration already stored");
                return Ok(DeclarationReceipt { declaration: existing, created: false });
            }

            let in_scope = self.store.find_in_scope(&draft.scope()).await?;
            let original = duplicates::find_original(&draft.scope(), &in_scope);

            if original.is_none() {
                match milestone.position(draft.declaration_date) {
                    WindowPosition::Within => {}
                    WindowPosition::TooEarly => {
                        warn!(declaration_type = %draft.declaration_type, "declaration before milestone start");
                        return Err(DeclarationError::rule(
                            RuleViolation::DeclarationTooEarly,
                            "The declaration date is before the milestone start date",
                        ));
                    }
                    WindowPosition::TooLate => {
                        warn!(declaration_type = %draft.declaration_type, "declaration after milestone date");
                        return Err(DeclarationError::rule(
                            RuleViolation::DeclarationTooLate,
                            "The declaration date is after the milestone date",
                        ));
                    }
                }
            }

            let initial = duplicates::initial_state(original, profile.funding_eligible);
            let declaration = Declaration::create(draft.clone(), initial, now);

            let mut changes = ChangeSet::new(format!("create {}", declaration.id));
            if initial == InitialState::Eligible {
                let item = self.ledger.billable_line_item(&declaration, now).await?;
                changes = changes.add_line_item(item);
            }
            changes = changes.insert_declaration(declaration.clone());

            match self.store.commit(changes, CommitMode::Apply).await {
                Ok(_) => {
                    info!(
                        declaration_id = %declaration.id,
                        state = %declaration.state,
                        duplicate = declaration.is_duplicate(),
                        "declaration created"
                    );
                    return Ok(DeclarationReceipt { declaration, created: true });
                }
                Err(e) if e.violates(constraints::SUBMISSION_KEY) => {
                    let existing = self
                        .store
                        .find_submission(&draft.submission_key())
                        .await?
                        .map(|d| d.id);
                    warn!(existing = ?existing, "concurrent identical declaration");
                    return Err(DeclarationError::Conflict { existing });
                }
                Err(e) if e.violates(constraints::LIVE_SCOPE_KEY) => {
                    debug!(attempt, "surviving declaration appeared concurrently, resolving again");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!("gave up resolving duplicates after {MAX_ATTEMPTS} attempts");
        Err(DeclarationError::Conflict { existing: None })
    }

    /// Withdraws an unpaid declaration and takes it off its statement
    #[instrument(skip(self), fields(declaration_id = %id))]
    pub async fn void_declaration(&self, id: DeclarationId) -> Result<Declaration, DeclarationError> {
        let declaration = self.get_declaration(id).await?;
        if !declaration.state.is_voidable() {
            warn!(state = %declaration.state, "void rejected");
            return Err(already_terminal(declaration.state));
        }

        let now = self.clock.now();
        let transition = declaration.transition(DeclarationState::Voided, None, now)?;
        let mut changes = ChangeSet::new(format!("void {id}")).transition(transition.clone());
        for item in self.store.line_items_for_declaration(id).await? {
            if item.active && item.intent == LineItemIntent::Billable {
                changes = changes.deactivate_line_item(item.id);
            }
        }

        self.commit_transition(changes).await?;
        info!("declaration voided");
        let mut updated = declaration;
        updated.apply(&transition);
        Ok(updated)
    }

    /// Promotes a submitted declaration once its participant is fundable
    #[instrument(skip(self), fields(declaration_id = %id))]
    pub async fn mark_eligible(&self, id: DeclarationId) -> Result<Declaration, DeclarationError> {
        let declaration = self.get_declaration(id).await?;
        let now = self.clock.now();
        let transition = declaration.transition(DeclarationState::Eligible, None, now)?;

        let fundable = self
            .directory
            .resolve_participant(declaration.participant_identity_id, declaration.provider_id, declaration.course)
            .await?
            .is_some_and(|profile| profile.funding_eligible);
        if !fundable {
            warn!("promotion rejected; participant not fundable");
            return Err(DeclarationError::rule(
                RuleViolation::ParticipantNotFundable,
                "The participant is not currently eligible for funding",
            ));
        }

        let item = self.ledger.billable_line_item(&declaration, now).await?;

        let changes = ChangeSet::new(format!("mark {id} eligible"))
            .transition(transition.clone())
            .add_line_item(item);
        self.commit_transition(changes).await?;

        info!("declaration eligible");
        let mut updated = declaration;
        updated.apply(&transition);
        Ok(updated)
    }

    async fn commit_transition(&self, changes: ChangeSet) -> Result<(), DeclarationError> {
        match self.store.commit(changes, CommitMode::Apply).await {
            Ok(_) => Ok(()),
            Err(PortError::PreconditionFailed { message }) => Err(DeclarationError::rule(
                RuleViolation::InvalidTransition,
                format!("The declaration changed while being updated: {message}"),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

fn already_terminal(state: DeclarationState) -> DeclarationError {
    DeclarationError::rule(
        RuleViolation::AlreadyTerminal,
        format!("The declaration is already terminal ({state}) and cannot be voided"),
    )
}

fn parse_request(request: &DeclarationRequest) -> Result<ParsedRequest, DeclarationError> {
    let mut errors = Vec::new();

    let participant_id = required(&mut errors, "participant_id", &request.participant_id).and_then(|raw| {
        raw.parse::<ParticipantIdentityId>()
            .map_err(|_| {
                errors.push(FieldError::new(
                    "participant_id",
                    FieldErrorCode::InvalidFormat,
                    "The participant ID must be a UUID",
                ))
            })
            .ok()
    });
    let course: Option<CourseIdentifier> = required(&mut errors, "course_identifier", &request.course_identifier)
        .and_then(|raw| vocabulary(&mut errors, "course_identifier", raw));
    let declaration_type: Option<DeclarationType> = required(&mut errors, "declaration_type", &request.declaration_type)
        .and_then(|raw| vocabulary(&mut errors, "declaration_type", raw));
    let declaration_date = required(&mut errors, "declaration_date", &request.declaration_date).and_then(|raw| {
        DateTime::parse_from_rfc3339(raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|_| {
                errors.push(FieldError::new(
                    "declaration_date",
                    FieldErrorCode::InvalidFormat,
                    "The declaration date must be an RFC 3339 timestamp",
                ))
            })
            .ok()
    });
    let evidence_held: Option<EvidenceHeld> = match request.evidence_held.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => vocabulary(&mut errors, "evidence_held", raw),
    };

    match (participant_id, course, declaration_type, declaration_date) {
        (Some(participant_id), Some(course), Some(declaration_type), Some(declaration_date))
            if errors.is_empty() =>
        {
            Ok(ParsedRequest {
                participant_id,
                course,
                declaration_type,
                declaration_date,
                evidence_held,
            })
        }
        _ => Err(DeclarationError::Validation(errors)),
    }
}

fn required<'a>(errors: &mut Vec<FieldError>, field: &str, raw: &'a str) -> Option<&'a str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, FieldErrorCode::Missing, format!("{field} is required")));
        None
    } else {
        Some(trimmed)
    }
}

fn vocabulary<T>(errors: &mut Vec<FieldError>, field: &str, raw: &str) -> Option<T>
where
    T: std::str::FromStr<Err = crate::course::UnknownValue>,
{
    raw.parse::<T>()
        .map_err(|e| errors.push(FieldError::new(field, FieldErrorCode::InvalidValue, e.to_string())))
        .ok()
}
