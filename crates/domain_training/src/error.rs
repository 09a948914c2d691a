//! Training record errors

use thiserror::Error;

use core_kernel::{InductionRecordId, ParticipantProfileId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrainingRecordError {
    #[error("It is not possible to determine a status for both a school and a delivery partner")]
    SchoolAndDeliveryPartner,

    #[error("Induction record {record} does not belong to participant profile {profile}")]
    ForeignInductionRecord {
        record: InductionRecordId,
        profile: ParticipantProfileId,
    },
}
