//! Training record state DTOs

use serde::Deserialize;

use core_kernel::{DeliveryPartnerId, SchoolId};
use domain_training::{InductionRecord, TrainingProfile};

/// Body of `POST /api/v1/training-record-states`
///
/// Without an explicit induction record the engine picks one from the
/// profile, preferring the delivery partner's and then the school's.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingRecordStateBody {
    pub profile: TrainingProfile,
    #[serde(default)]
    pub induction_record: Option<InductionRecord>,
    #[serde(default)]
    pub delivery_partner_id: Option<DeliveryPartnerId>,
    #[serde(default)]
    pub school_id: Option<SchoolId>,
}
