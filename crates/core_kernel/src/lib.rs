//! Core Kernel - Foundational types for the CPD funding system
//!
//! This crate provides the building blocks shared by the declaration,
//! statement and training-record domains:
//! - Strongly typed identifiers for every persisted entity
//! - Milestone windows and jurisdiction-aware calendar conversion
//! - The port error type and marker traits used by storage adapters

pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use temporal::{Clock, FixedClock, MilestoneWindow, SystemClock, Timezone, WindowPosition};
pub use identifiers::{
    DeclarationId, DeclarationStateId, ParticipantProfileId, ParticipantIdentityId,
    ProviderId, StatementId, LineItemId, ScheduleId, InductionRecordId,
    SchoolId, DeliveryPartnerId, PartnershipId,
};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
