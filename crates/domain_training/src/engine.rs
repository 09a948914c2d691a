//! The training record state cascade
//!
//! Layers are evaluated in priority order and the first one that does not
//! pass decides the record state. When every layer passes, the record state
//! is the active training value.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use core_kernel::{DeliveryPartnerId, SchoolId};

use crate::error::TrainingRecordError;
use crate::profile::{InductionRecord, ProgrammeType, TrainingProfile};
use crate::rules::{self, Signals};
use crate::states::{
    FundingEligibilityState, RecordState, TrainingEligibilityState, TrainingState, ValidationState,
};

/// Every layer's value and the composite outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrainingRecordState {
    pub validation_state: ValidationState,
    pub training_eligibility_state: TrainingEligibilityState,
    pub funding_eligibility_state: FundingEligibilityState,
    pub training_state: TrainingState,
    pub record_state: RecordState,
}

/// Chooses the induction record the state is reported against
///
/// An explicit record wins. Otherwise the latest record with the given
/// delivery partner, then the latest with the given school, then the
/// participant's latest record.
pub fn resolve_induction_record<'a>(
    profile: &'a TrainingProfile,
    induction_record: Option<&'a InductionRecord>,
    delivery_partner: Option<DeliveryPartnerId>,
    school: Option<SchoolId>,
) -> Result<Option<&'a InductionRecord>, TrainingRecordError> {
    if delivery_partner.is_some() && school.is_some() {
        return Err(TrainingRecordError::SchoolAndDeliveryPartner);
    }

    if let Some(record) = induction_record {
        if record.participant_profile_id != profile.id {
            return Err(TrainingRecordError::ForeignInductionRecord {
                record: record.id,
                profile: profile.id,
            });
        }
        return Ok(Some(record));
    }

    let scoped = match (delivery_partner, school) {
        (Some(partner), _) => {
            profile.latest_induction_record(|record| record.delivery_partner_id == Some(partner))
        }
        (None, Some(school)) => profile.latest_induction_record(|record| record.school_id == school),
        (None, None) => None,
    };
    Ok(scoped.or_else(|| profile.latest_induction_record(|_| true)))
}

/// Determines the training record state as of now
pub fn determine(
    profile: &TrainingProfile,
    induction_record: Option<&InductionRecord>,
    delivery_partner: Option<DeliveryPartnerId>,
    school: Option<SchoolId>,
) -> Result<TrainingRecordState, TrainingRecordError> {
    determine_at(profile, induction_record, delivery_partner, school, Utc::now())
}

/// Determines the training record state as of `as_of`
pub fn determine_at(
    profile: &TrainingProfile,
    induction_record: Option<&InductionRecord>,
    delivery_partner: Option<DeliveryPartnerId>,
    school: Option<SchoolId>,
    as_of: DateTime<Utc>,
) -> Result<TrainingRecordState, TrainingRecordError> {
    let induction = resolve_induction_record(profile, induction_record, delivery_partner, school)?;
    let signals = Signals { profile, induction, as_of };

    let training_state = rules::TRAINING.evaluate(&signals);
    let validation_state = rules::VALIDATION.evaluate(&signals);
    let training_eligibility_state = rules::training_eligibility_layer(profile.role).evaluate(&signals);
    let funding_eligibility_state = rules::funding_eligibility_layer(profile.role).evaluate(&signals);

    let on_materials_programme = induction.is_some_and(|record| record.programme == ProgrammeType::Cip);

    let cascade = [
        (!training_state.is_stopping(), RecordState::Training(training_state)),
        (validation_state == ValidationState::Valid, RecordState::Validation(validation_state)),
        (
            rules::eligible_for_training(profile.role).contains(&training_eligibility_state),
            RecordState::TrainingEligibility(training_eligibility_state),
        ),
        (
            on_materials_programme
                || rules::eligible_for_funding(profile.role).contains(&funding_eligibility_state),
            RecordState::FundingEligibility(funding_eligibility_state),
        ),
    ];

    let record_state = cascade
        .into_iter()
        .find(|(passing, _)| !passing)
        .map(|(_, state)| state)
        .unwrap_or(RecordState::Training(training_state));

    debug!(profile_id = %profile.id, %record_state, "training record state determined");

    Ok(TrainingRecordState {
        validation_state,
        training_eligibility_state,
        funding_eligibility_state,
        training_state,
        record_state,
    })
}
