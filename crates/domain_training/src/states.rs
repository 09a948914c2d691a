//! Output vocabularies of the four layers
//!
//! Each layer yields one value from a closed set. [`RecordState`] is the
//! union of all four and is what the cascade finally reports.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

macro_rules! layer_states {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

layer_states!(
    /// Layer 1: where the participant is in their training
    TrainingState {
        WithdrawnProgramme => "withdrawn_programme",
        WithdrawnTraining => "withdrawn_training",
        DeferredTraining => "deferred_training",
        CompletedTraining => "completed_training",
        Leaving => "leaving",
        Left => "left",
        Joining => "joining",
        NotRegisteredForTraining => "not_registered_for_training",
        RegisteredForFipNoPartner => "registered_for_fip_no_partner",
        ActiveFipTraining => "active_fip_training",
        ActiveCipTraining => "active_cip_training",
        ActiveDiyTraining => "active_diy_training",
    }
);

impl TrainingState {
    /// Stopping states end the cascade at the first layer
    pub fn is_stopping(&self) -> bool {
        matches!(
            self,
            TrainingState::WithdrawnProgramme
                | TrainingState::WithdrawnTraining
                | TrainingState::DeferredTraining
                | TrainingState::CompletedTraining
                | TrainingState::Leaving
                | TrainingState::Left
                | TrainingState::Joining
        )
    }
}

layer_states!(
    /// Layer 2: whether the participant's details matched a teacher record
    ValidationState {
        DifferentTrn => "different_trn",
        RequestForDetailsDelivered => "request_for_details_delivered",
        RequestForDetailsFailed => "request_for_details_failed",
        RequestForDetailsSubmitted => "request_for_details_submitted",
        ValidationNotStarted => "validation_not_started",
        InternalError => "internal_error",
        TraRecordNotFound => "tra_record_not_found",
        Valid => "valid",
    }
);

layer_states!(
    /// Layer 3: whether the participant may take part in training
    TrainingEligibilityState {
        ChecksNotComplete => "checks_not_complete",
        ActiveFlags => "active_flags",
        DuplicateProfile => "duplicate_profile",
        NotQualified => "not_qualified",
        ExemptFromInduction => "exempt_from_induction",
        PreviousInduction => "previous_induction",
        NotYetMentoring => "not_yet_mentoring",
        EligibleForInductionTraining => "eligible_for_induction_training",
        EligibleForMentorTraining => "eligible_for_mentor_training",
    }
);

layer_states!(
    /// Layer 4: whether the participant's training is funded
    FundingEligibilityState {
        ChecksNotComplete => "checks_not_complete",
        Ineligible => "ineligible",
        IneligibleEroPrimary => "ineligible_ero_primary",
        IneligibleEroSecondary => "ineligible_ero_secondary",
        IneligibleEro => "ineligible_ero",
        IneligibleSecondary => "ineligible_secondary",
        EligibleForFipFunding => "eligible_for_fip_funding",
        EligibleForFipFundingWithUplift => "eligible_for_fip_funding_with_uplift",
        EligibleForMentorFunding => "eligible_for_mentor_funding",
        EligibleForMentorFundingPrimary => "eligible_for_mentor_funding_primary",
    }
);

/// The composite state: a value from whichever layer decided it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordState {
    Training(TrainingState),
    Validation(ValidationState),
    TrainingEligibility(TrainingEligibilityState),
    FundingEligibility(FundingEligibilityState),
}

impl RecordState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Training(state) => state.as_str(),
            RecordState::Validation(state) => state.as_str(),
            RecordState::TrainingEligibility(state) => state.as_str(),
            RecordState::FundingEligibility(state) => state.as_str(),
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl PartialEq<&str> for RecordState {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_state_serializes_as_plain_string() {
        let state = RecordState::Validation(ValidationState::RequestForDetailsSubmitted);
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            "\"request_for_details_submitted\""
        );
    }

    #[test]
    fn test_stopping_set() {
        let stopping: Vec<_> = TrainingState::ALL.iter().filter(|s| s.is_stopping()).collect();
        assert_eq!(stopping.len(), 7);
        assert!(!TrainingState::ActiveFipTraining.is_stopping());
    }
}
