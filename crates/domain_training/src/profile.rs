//! Inputs to the training record state engine
//!
//! These are snapshots supplied by the programme system: the participant
//! profile with its validation and eligibility data, and the induction
//! records that place the participant with a school and delivery partner.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    DeliveryPartnerId, InductionRecordId, ParticipantProfileId, PartnershipId, SchoolId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Ect,
    Mentor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Active,
    Withdrawn,
}

/// Whether a person holds one profile or is the primary or secondary of a
/// pair of profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileDuplicity {
    #[default]
    Single,
    Primary,
    Secondary,
}

/// Details the participant gave for matching against the teacher record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationData {
    pub trn: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
}

/// The matched record from the teacher regulation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherRecord {
    pub trn: String,
}

/// Delivery status of the email asking the participant for their details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestForDetails {
    Submitted,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    Eligible,
    Ineligible,
    ManualCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityReason {
    ActiveFlags,
    ExemptFromInduction,
    DuplicateProfile,
    PreviousInduction,
    PreviousParticipation,
    NoQts,
    DifferentTrn,
    NoInduction,
}

/// Outcome of the funding eligibility checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRecord {
    pub status: EligibilityStatus,
    pub reason: Option<EligibilityReason>,
    #[serde(default)]
    pub previous_participation: bool,
    #[serde(default)]
    pub previous_induction: bool,
}

impl EligibilityRecord {
    pub fn eligible() -> Self {
        Self {
            status: EligibilityStatus::Eligible,
            reason: None,
            previous_participation: false,
            previous_induction: false,
        }
    }

    pub fn has_reason(&self, reason: EligibilityReason) -> bool {
        self.reason == Some(reason)
    }
}

/// School-level funding uplifts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uplift {
    pub sparsity: bool,
    pub pupil_premium: bool,
}

impl Uplift {
    pub fn any(&self) -> bool {
        self.sparsity || self.pupil_premium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgrammeType {
    /// Full induction programme with a lead provider
    Fip,
    /// Core induction programme using accredited materials
    Cip,
    /// School-designed programme
    Diy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InductionStatus {
    Active,
    Withdrawn,
    Deferred,
    Completed,
    Changed,
    Leaving,
}

/// A period of the participant's training at one school
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InductionRecord {
    pub id: InductionRecordId,
    pub participant_profile_id: ParticipantProfileId,
    pub programme: ProgrammeType,
    pub partnership_id: Option<PartnershipId>,
    pub school_id: SchoolId,
    pub delivery_partner_id: Option<DeliveryPartnerId>,
    pub training_status: InductionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Everything the engine reads about one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingProfile {
    pub id: ParticipantProfileId,
    pub role: ParticipantRole,
    pub status: ProfileStatus,
    pub validation_data: Option<ValidationData>,
    pub teacher_record: Option<TeacherRecord>,
    pub request_for_details: Option<RequestForDetails>,
    pub eligibility: Option<EligibilityRecord>,
    #[serde(default)]
    pub uplift: Uplift,
    #[serde(default)]
    pub duplicity: ProfileDuplicity,
    #[serde(default)]
    pub mentee_count: u32,
    pub induction_completion_date: Option<NaiveDate>,
    pub mentor_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub induction_records: Vec<InductionRecord>,
}

impl TrainingProfile {
    pub fn completion_date(&self) -> Option<NaiveDate> {
        match self.role {
            ParticipantRole::Ect => self.induction_completion_date,
            ParticipantRole::Mentor => self.mentor_completion_date,
        }
    }

    /// The latest induction record, optionally restricted by `filter`
    pub fn latest_induction_record<F>(&self, filter: F) -> Option<&InductionRecord>
    where
        F: Fn(&InductionRecord) -> bool,
    {
        self.induction_records
            .iter()
            .filter(|record| filter(record))
            .max_by_key(|record| (record.start_date, record.created_at))
    }
}
