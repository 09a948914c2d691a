//! Declaration aggregate
//!
//! A declaration is a provider's claim that a participant reached a training
//! milestone. It is created once, moves through a fixed state machine and is
//! never deleted; every state it enters is kept in its history.
//!
//! # Lifecycle
//!
//! ```text
//! submitted ──> eligible ──> payable ──> paid ──> awaiting_clawback ──> clawed_back
//!     │             │           │
//!     └──> ineligible            └──> voided (from any state before paid)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    DeclarationId, DeclarationStateId, ParticipantIdentityId, ParticipantProfileId, ProviderId,
};

use crate::course::{CourseIdentifier, DeclarationType, EvidenceHeld, UnknownValue};
use crate::error::{DeclarationError, RuleViolation};
use crate::schedule::Cohort;

/// Declaration lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationState {
    Submitted,
    Eligible,
    Ineligible,
    Payable,
    Paid,
    Voided,
    AwaitingClawback,
    ClawedBack,
}

impl DeclarationState {
    pub const ALL: [DeclarationState; 8] = [
        DeclarationState::Submitted,
        DeclarationState::Eligible,
        DeclarationState::Ineligible,
        DeclarationState::Payable,
        DeclarationState::Paid,
        DeclarationState::Voided,
        DeclarationState::AwaitingClawback,
        DeclarationState::ClawedBack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationState::Submitted => "submitted",
            DeclarationState::Eligible => "eligible",
            DeclarationState::Ineligible => "ineligible",
            DeclarationState::Payable => "payable",
            DeclarationState::Paid => "paid",
            DeclarationState::Voided => "voided",
            DeclarationState::AwaitingClawback => "awaiting_clawback",
            DeclarationState::ClawedBack => "clawed_back",
        }
    }

    /// Open to normal edits
    pub fn is_changeable(&self) -> bool {
        matches!(
            self,
            DeclarationState::Submitted | DeclarationState::Eligible | DeclarationState::Payable
        )
    }

    /// Counts towards the one-survivor-per-person rule
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            DeclarationState::Submitted
                | DeclarationState::Eligible
                | DeclarationState::Payable
                | DeclarationState::Paid
        )
    }

    pub fn is_voidable(&self) -> bool {
        self.is_changeable() || *self == DeclarationState::Ineligible
    }

    /// Billable states that should hold an active billable line item
    pub fn is_billable(&self) -> bool {
        matches!(
            self,
            DeclarationState::Eligible | DeclarationState::Payable | DeclarationState::Paid
        )
    }

    pub fn can_transition_to(&self, target: DeclarationState) -> bool {
        use DeclarationState::*;
        matches!(
            (*self, target),
            (Submitted, Eligible) |
            (Submitted, Ineligible) |
            (Submitted, Voided) |
            (Eligible, Payable) |
            (Eligible, Ineligible) |
            (Eligible, Voided) |
            (Payable, Paid) |
            (Payable, Voided) |
            (Ineligible, Voided) |
            (Paid, AwaitingClawback) |
            (AwaitingClawback, ClawedBack)
        )
    }
}

impl fmt::Display for DeclarationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclarationState {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeclarationState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownValue {
                kind: "declaration state",
                value: s.to_string(),
            })
    }
}

/// Why a state was entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateReason {
    Duplicate,
}

impl StateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateReason::Duplicate => "duplicate",
        }
    }
}

impl FromStr for StateReason {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duplicate" => Ok(StateReason::Duplicate),
            other => Err(UnknownValue {
                kind: "state reason",
                value: other.to_string(),
            }),
        }
    }
}

/// One entry of a declaration's append-only state history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationStateRecord {
    pub id: DeclarationStateId,
    pub declaration_id: DeclarationId,
    pub state: DeclarationState,
    pub reason: Option<StateReason>,
    pub created_at: DateTime<Utc>,
}

impl DeclarationStateRecord {
    pub fn new(
        declaration_id: DeclarationId,
        state: DeclarationState,
        reason: Option<StateReason>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DeclarationStateId::new_v7(),
            declaration_id,
            state,
            reason,
            created_at,
        }
    }
}

/// Validated fields of a new declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationDraft {
    pub participant_profile_id: ParticipantProfileId,
    pub participant_identity_id: ParticipantIdentityId,
    pub provider_id: ProviderId,
    pub course: CourseIdentifier,
    pub declaration_type: DeclarationType,
    pub declaration_date: DateTime<Utc>,
    pub evidence_held: Option<EvidenceHeld>,
    pub cohort: Cohort,
}

impl DeclarationDraft {
    pub fn submission_key(&self) -> SubmissionKey {
        SubmissionKey {
            participant_profile_id: self.participant_profile_id,
            provider_id: self.provider_id,
            course: self.course,
            declaration_type: self.declaration_type,
            declaration_date: self.declaration_date,
        }
    }

    pub fn scope(&self) -> DuplicateScope {
        DuplicateScope {
            participant_identity_id: self.participant_identity_id,
            provider_id: self.provider_id,
            course: self.course,
            declaration_type: self.declaration_type,
        }
    }
}

/// The five fields that make a submission idempotent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionKey {
    pub participant_profile_id: ParticipantProfileId,
    pub provider_id: ProviderId,
    pub course: CourseIdentifier,
    pub declaration_type: DeclarationType,
    pub declaration_date: DateTime<Utc>,
}

/// The person-level scope in which only one declaration may survive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DuplicateScope {
    pub participant_identity_id: ParticipantIdentityId,
    pub provider_id: ProviderId,
    pub course: CourseIdentifier,
    pub declaration_type: DeclarationType,
}

/// How a new declaration enters the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialState {
    Submitted,
    Eligible,
    /// Later claim for an already-declared milestone
    DuplicateOf(DeclarationId),
}

/// A requested state change, applied by the store only if the declaration
/// is still in `from`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub declaration_id: DeclarationId,
    pub from: DeclarationState,
    pub to: DeclarationState,
    pub record: DeclarationStateRecord,
}

/// Declaration aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclarationId,
    pub participant_profile_id: ParticipantProfileId,
    pub participant_identity_id: ParticipantIdentityId,
    pub provider_id: ProviderId,
    pub course: CourseIdentifier,
    pub declaration_type: DeclarationType,
    pub declaration_date: DateTime<Utc>,
    pub evidence_held: Option<EvidenceHeld>,
    pub cohort: Cohort,
    pub state: DeclarationState,
    /// The original this declaration duplicates
    pub superseded_by_id: Option<DeclarationId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<DeclarationStateRecord>,
}

impl Declaration {
    /// Builds a new declaration with its opening history
    ///
    /// Duplicates are recorded as submitted and then ineligible in the same
    /// instant so their history reads the same as any other rejection.
    pub fn create(draft: DeclarationDraft, initial: InitialState, now: DateTime<Utc>) -> Self {
        let id = DeclarationId::new_v7();
        let mut history = vec![DeclarationStateRecord::new(
            id,
            DeclarationState::Submitted,
            None,
            now,
        )];

        let (state, superseded_by_id) = match initial {
            InitialState::Submitted => (DeclarationState::Submitted, None),
            InitialState::Eligible => {
                history.push(DeclarationStateRecord::new(id, DeclarationState::Eligible, None, now));
                (DeclarationState::Eligible, None)
            }
            InitialState::DuplicateOf(original) => {
                history.push(DeclarationStateRecord::new(
                    id,
                    DeclarationState::Ineligible,
                    Some(StateReason::Duplicate),
                    now,
                ));
                (DeclarationState::Ineligible, Some(original))
            }
        };

        Self {
            id,
            participant_profile_id: draft.participant_profile_id,
            participant_identity_id: draft.participant_identity_id,
            provider_id: draft.provider_id,
            course: draft.course,
            declaration_type: draft.declaration_type,
            declaration_date: draft.declaration_date,
            evidence_held: draft.evidence_held,
            cohort: draft.cohort,
            state,
            superseded_by_id,
            created_at: now,
            updated_at: now,
            history,
        }
    }

    pub fn submission_key(&self) -> SubmissionKey {
        SubmissionKey {
            participant_profile_id: self.participant_profile_id,
            provider_id: self.provider_id,
            course: self.course,
            declaration_type: self.declaration_type,
            declaration_date: self.declaration_date,
        }
    }

    pub fn scope(&self) -> DuplicateScope {
        DuplicateScope {
            participant_identity_id: self.participant_identity_id,
            provider_id: self.provider_id,
            course: self.course,
            declaration_type: self.declaration_type,
        }
    }

    /// Whether this declaration can be the original of later duplicates
    pub fn is_surviving(&self) -> bool {
        self.state.is_live() && self.superseded_by_id.is_none()
    }

    pub fn is_duplicate(&self) -> bool {
        self.superseded_by_id.is_some()
    }

    /// Plans a move to `target` without changing `self`
    pub fn transition(
        &self,
        target: DeclarationState,
        reason: Option<StateReason>,
        at: DateTime<Utc>,
    ) -> Result<StateTransition, DeclarationError> {
        if !self.state.can_transition_to(target) {
            return Err(DeclarationError::rule(
                RuleViolation::InvalidTransition,
                format!("Declaration cannot move from {} to {}", self.state, target),
            ));
        }
        Ok(StateTransition {
            declaration_id: self.id,
            from: self.state,
            to: target,
            record: DeclarationStateRecord::new(self.id, target, reason, at),
        })
    }

    /// Applies a planned transition; adapters call this once the
    /// compare-and-set has succeeded
    pub fn apply(&mut self, transition: &StateTransition) {
        self.state = transition.to;
        self.updated_at = transition.record.created_at;
        self.history.push(transition.record.clone());
    }
}
