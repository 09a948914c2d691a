//! Participant profiles as seen by the declaration domain
//!
//! Profiles are owned by the programme system; this crate only reads them
//! through [`ParticipantDirectory`](crate::ports::ParticipantDirectory).

use serde::{Deserialize, Serialize};

use core_kernel::{ParticipantIdentityId, ParticipantProfileId, ProviderId, ScheduleId};

use crate::course::CourseIdentifier;
use crate::schedule::Cohort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Active,
    Withdrawn,
}

/// A participant's enrolment on one course with one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantProfile {
    pub id: ParticipantProfileId,
    /// The underlying person; several profiles may share one identity
    pub identity_id: ParticipantIdentityId,
    pub provider_id: ProviderId,
    pub course: CourseIdentifier,
    pub cohort: Cohort,
    pub schedule_id: ScheduleId,
    pub status: ProfileStatus,
    /// Whether declarations for this profile start out fundable
    pub funding_eligible: bool,
}

impl ParticipantProfile {
    /// True when the profile can take declarations from `provider` for `course`
    pub fn is_active_for(&self, provider: ProviderId, course: CourseIdentifier) -> bool {
        self.status == ProfileStatus::Active && self.provider_id == provider && self.course == course
    }
}
