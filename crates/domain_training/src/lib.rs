//! Training Domain - Training record state engine
//!
//! Derives one composite status for a programme participant from four
//! independently evolving signals: training activity, validation against
//! the teacher record, training eligibility and funding eligibility.
//!
//! The engine is a pure function of its inputs; it performs no I/O.

pub mod profile;
pub mod states;
pub mod rules;
pub mod engine;
pub mod error;

pub use profile::{
    EligibilityReason, EligibilityRecord, EligibilityStatus, InductionRecord, InductionStatus,
    ParticipantRole, ProfileDuplicity, ProfileStatus, ProgrammeType, RequestForDetails,
    TeacherRecord, TrainingProfile, Uplift, ValidationData,
};
pub use states::{
    FundingEligibilityState, RecordState, TrainingEligibilityState, TrainingState, ValidationState,
};
pub use engine::{determine, determine_at, resolve_induction_record, TrainingRecordState};
pub use error::TrainingRecordError;
