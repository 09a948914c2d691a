//! Rule tables for the four layers
//!
//! Each layer is an ordered list of rules; the first rule whose predicate
//! holds gives the layer's value, and the fallback applies when none does.
//! Keeping the rules as data lets every layer be tested on its own.

use chrono::{DateTime, Utc};

use crate::profile::{
    EligibilityReason, EligibilityRecord, EligibilityStatus, InductionRecord, InductionStatus,
    ParticipantRole, ProfileDuplicity, ProfileStatus, ProgrammeType, RequestForDetails,
    TrainingProfile,
};
use crate::states::{
    FundingEligibilityState, TrainingEligibilityState, TrainingState, ValidationState,
};

/// The inputs one evaluation reads
#[derive(Debug, Clone, Copy)]
pub struct Signals<'a> {
    pub profile: &'a TrainingProfile,
    pub induction: Option<&'a InductionRecord>,
    pub as_of: DateTime<Utc>,
}

impl<'a> Signals<'a> {
    fn eligibility(&self) -> Option<&'a EligibilityRecord> {
        self.profile.eligibility.as_ref()
    }

    fn eligibility_is(&self, status: EligibilityStatus) -> bool {
        self.eligibility().is_some_and(|e| e.status == status)
    }

    fn reason_is(&self, reason: EligibilityReason) -> bool {
        self.eligibility().is_some_and(|e| e.has_reason(reason))
    }

    fn induction_is(&self, status: InductionStatus) -> bool {
        self.induction.is_some_and(|record| record.training_status == status)
    }

    fn ended(&self) -> bool {
        self.induction
            .and_then(|record| record.end_date)
            .is_some_and(|end| end <= self.as_of)
    }

    fn awaiting_details(&self, status: RequestForDetails) -> bool {
        self.profile.validation_data.is_none() && self.profile.request_for_details == Some(status)
    }

    fn previous_participation(&self) -> bool {
        self.eligibility()
            .is_some_and(|e| e.previous_participation || e.has_reason(EligibilityReason::PreviousParticipation))
    }
}

pub struct Rule<S> {
    pub value: S,
    pub applies: fn(&Signals) -> bool,
}

pub struct Layer<S: 'static> {
    pub name: &'static str,
    pub rules: &'static [Rule<S>],
    pub fallback: fn(&Signals) -> S,
}

impl<S: Copy> Layer<S> {
    pub fn evaluate(&self, signals: &Signals) -> S {
        self.rules
            .iter()
            .find(|rule| (rule.applies)(signals))
            .map(|rule| rule.value)
            .unwrap_or_else(|| (self.fallback)(signals))
    }
}

pub static TRAINING: Layer<TrainingState> = Layer {
    name: "training",
    rules: &[
        Rule {
            value: TrainingState::WithdrawnProgramme,
            applies: |s| s.profile.status == ProfileStatus::Withdrawn,
        },
        Rule {
            value: TrainingState::WithdrawnTraining,
            applies: |s| s.induction_is(InductionStatus::Withdrawn),
        },
        Rule {
            value: TrainingState::DeferredTraining,
            applies: |s| s.induction_is(InductionStatus::Deferred),
        },
        Rule {
            value: TrainingState::CompletedTraining,
            applies: |s| {
                s.induction_is(InductionStatus::Completed)
                    || s.profile
                        .completion_date()
                        .is_some_and(|date| date <= s.as_of.date_naive())
            },
        },
        Rule {
            value: TrainingState::Leaving,
            applies: |s| s.induction_is(InductionStatus::Leaving) && !s.ended(),
        },
        Rule {
            value: TrainingState::Left,
            applies: |s| {
                (s.induction_is(InductionStatus::Leaving) || s.induction_is(InductionStatus::Changed))
                    && s.ended()
            },
        },
        Rule {
            value: TrainingState::Joining,
            applies: |s| s.induction.is_some_and(|record| record.start_date > s.as_of),
        },
    ],
    fallback: active_training,
};

/// The active value for a participant who has not stopped
fn active_training(signals: &Signals) -> TrainingState {
    match signals.induction {
        None => TrainingState::NotRegisteredForTraining,
        Some(record) => match record.programme {
            ProgrammeType::Fip if record.partnership_id.is_none() => {
                TrainingState::RegisteredForFipNoPartner
            }
            ProgrammeType::Fip => TrainingState::ActiveFipTraining,
            ProgrammeType::Cip => TrainingState::ActiveCipTraining,
            ProgrammeType::Diy => TrainingState::ActiveDiyTraining,
        },
    }
}

pub static VALIDATION: Layer<ValidationState> = Layer {
    name: "validation",
    rules: &[
        Rule {
            value: ValidationState::DifferentTrn,
            applies: |s| s.reason_is(EligibilityReason::DifferentTrn),
        },
        Rule {
            value: ValidationState::RequestForDetailsDelivered,
            applies: |s| s.awaiting_details(RequestForDetails::Delivered),
        },
        Rule {
            value: ValidationState::RequestForDetailsFailed,
            applies: |s| s.awaiting_details(RequestForDetails::Failed),
        },
        Rule {
            value: ValidationState::RequestForDetailsSubmitted,
            applies: |s| s.awaiting_details(RequestForDetails::Submitted),
        },
        Rule {
            value: ValidationState::ValidationNotStarted,
            applies: |s| s.profile.validation_data.is_none(),
        },
        Rule {
            value: ValidationState::TraRecordNotFound,
            applies: |s| s.profile.teacher_record.is_none(),
        },
        Rule {
            value: ValidationState::InternalError,
            applies: |s| s.profile.eligibility.is_none(),
        },
    ],
    fallback: |_| ValidationState::Valid,
};

pub static ECT_TRAINING_ELIGIBILITY: Layer<TrainingEligibilityState> = Layer {
    name: "ect_training_eligibility",
    rules: &[
        Rule {
            value: TrainingEligibilityState::ChecksNotComplete,
            applies: |s| s.profile.eligibility.is_none(),
        },
        Rule {
            value: TrainingEligibilityState::ActiveFlags,
            applies: |s| s.reason_is(EligibilityReason::ActiveFlags),
        },
        Rule {
            value: TrainingEligibilityState::DuplicateProfile,
            applies: |s| {
                s.profile.duplicity == ProfileDuplicity::Secondary
                    || s.reason_is(EligibilityReason::DuplicateProfile)
            },
        },
        Rule {
            value: TrainingEligibilityState::NotQualified,
            applies: |s| s.reason_is(EligibilityReason::NoQts),
        },
        Rule {
            value: TrainingEligibilityState::ExemptFromInduction,
            applies: |s| s.reason_is(EligibilityReason::ExemptFromInduction),
        },
        Rule {
            value: TrainingEligibilityState::PreviousInduction,
            applies: |s| {
                s.reason_is(EligibilityReason::PreviousInduction)
                    || s.eligibility().is_some_and(|e| e.previous_induction)
            },
        },
        Rule {
            value: TrainingEligibilityState::ChecksNotComplete,
            applies: |s| s.eligibility_is(EligibilityStatus::ManualCheck),
        },
    ],
    fallback: |_| TrainingEligibilityState::EligibleForInductionTraining,
};

pub static MENTOR_TRAINING_ELIGIBILITY: Layer<TrainingEligibilityState> = Layer {
    name: "mentor_training_eligibility",
    rules: &[
        Rule {
            value: TrainingEligibilityState::ChecksNotComplete,
            applies: |s| s.profile.eligibility.is_none(),
        },
        Rule {
            value: TrainingEligibilityState::ActiveFlags,
            applies: |s| s.reason_is(EligibilityReason::ActiveFlags),
        },
        Rule {
            value: TrainingEligibilityState::NotYetMentoring,
            applies: |s| s.profile.mentee_count == 0,
        },
    ],
    fallback: |_| TrainingEligibilityState::EligibleForMentorTraining,
};

pub static ECT_FUNDING_ELIGIBILITY: Layer<FundingEligibilityState> = Layer {
    name: "ect_funding_eligibility",
    rules: &[
        Rule {
            value: FundingEligibilityState::ChecksNotComplete,
            applies: |s| {
                s.profile.eligibility.is_none() || s.eligibility_is(EligibilityStatus::ManualCheck)
            },
        },
        Rule {
            value: FundingEligibilityState::Ineligible,
            applies: |s| s.eligibility_is(EligibilityStatus::Ineligible),
        },
        Rule {
            value: FundingEligibilityState::EligibleForFipFundingWithUplift,
            applies: |s| s.profile.uplift.any(),
        },
    ],
    fallback: |_| FundingEligibilityState::EligibleForFipFunding,
};

pub static MENTOR_FUNDING_ELIGIBILITY: Layer<FundingEligibilityState> = Layer {
    name: "mentor_funding_eligibility",
    rules: &[
        Rule {
            value: FundingEligibilityState::ChecksNotComplete,
            applies: |s| {
                s.profile.eligibility.is_none() || s.eligibility_is(EligibilityStatus::ManualCheck)
            },
        },
        Rule {
            value: FundingEligibilityState::IneligibleEroPrimary,
            applies: |s| s.previous_participation() && s.profile.duplicity == ProfileDuplicity::Primary,
        },
        Rule {
            value: FundingEligibilityState::IneligibleEroSecondary,
            applies: |s| s.previous_participation() && s.profile.duplicity == ProfileDuplicity::Secondary,
        },
        Rule {
            value: FundingEligibilityState::IneligibleEro,
            applies: |s| s.previous_participation(),
        },
        Rule {
            value: FundingEligibilityState::IneligibleSecondary,
            applies: |s| s.profile.duplicity == ProfileDuplicity::Secondary,
        },
        Rule {
            value: FundingEligibilityState::Ineligible,
            applies: |s| s.eligibility_is(EligibilityStatus::Ineligible),
        },
        Rule {
            value: FundingEligibilityState::EligibleForMentorFundingPrimary,
            applies: |s| s.profile.duplicity == ProfileDuplicity::Primary,
        },
    ],
    fallback: |_| FundingEligibilityState::EligibleForMentorFunding,
};

pub fn training_eligibility_layer(role: ParticipantRole) -> &'static Layer<TrainingEligibilityState> {
    match role {
        ParticipantRole::Ect => &ECT_TRAINING_ELIGIBILITY,
        ParticipantRole::Mentor => &MENTOR_TRAINING_ELIGIBILITY,
    }
}

pub fn funding_eligibility_layer(role: ParticipantRole) -> &'static Layer<FundingEligibilityState> {
    match role {
        ParticipantRole::Ect => &ECT_FUNDING_ELIGIBILITY,
        ParticipantRole::Mentor => &MENTOR_FUNDING_ELIGIBILITY,
    }
}

/// Training eligibility values that let the cascade continue
pub fn eligible_for_training(role: ParticipantRole) -> &'static [TrainingEligibilityState] {
    match role {
        ParticipantRole::Ect => &[TrainingEligibilityState::EligibleForInductionTraining],
        ParticipantRole::Mentor => &[
            TrainingEligibilityState::NotYetMentoring,
            TrainingEligibilityState::EligibleForMentorTraining,
        ],
    }
}

/// Funding values that let the cascade continue
pub fn eligible_for_funding(role: ParticipantRole) -> &'static [FundingEligibilityState] {
    match role {
        ParticipantRole::Ect => &[
            FundingEligibilityState::EligibleForFipFunding,
            FundingEligibilityState::EligibleForFipFundingWithUplift,
        ],
        ParticipantRole::Mentor => &[
            FundingEligibilityState::EligibleForMentorFunding,
            FundingEligibilityState::EligibleForMentorFundingPrimary,
        ],
    }
}
