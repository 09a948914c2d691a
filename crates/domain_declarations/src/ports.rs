//! Declaration Domain Ports
//!
//! The declaration services depend on two ports:
//!
//! - [`DeclarationStore`]: declarations, statements and line items, written
//!   only through atomic [`ChangeSet`] commits
//! - [`ParticipantDirectory`]: read-only participant profiles and schedules
//!   owned by the programme system
//!
//! Adapters live in `infra_db` (PostgreSQL) and [`crate::adapters`]
//! (in-memory).

use async_trait::async_trait;

use core_kernel::{
    DeclarationId, DomainPort, HealthCheckable, ParticipantIdentityId, PortError, ProviderId,
    ScheduleId, StatementId,
};

use crate::changeset::{ChangeSet, CommitMode, CommitReport};
use crate::course::CourseIdentifier;
use crate::declaration::{Declaration, DuplicateScope, SubmissionKey};
use crate::line_item::LineItem;
use crate::participant::ParticipantProfile;
use crate::schedule::{Cohort, Schedule};
use crate::statement::{Statement, StatementQuery};

/// Storage-layer uniqueness constraints every store enforces on commit
pub mod constraints {
    /// No two non-voided declarations share a submission key
    pub const SUBMISSION_KEY: &str = "participant_declarations_submission_key";
    /// One surviving declaration per person, provider, course and type
    pub const LIVE_SCOPE_KEY: &str = "participant_declarations_live_scope_key";
    /// One active line item per declaration and intent
    pub const ACTIVE_LINE_ITEM_KEY: &str = "statement_line_items_active_key";
}

/// Port for declaration, statement and line-item storage
#[async_trait]
pub trait DeclarationStore: DomainPort + HealthCheckable {
    async fn get_declaration(&self, id: DeclarationId) -> Result<Option<Declaration>, PortError>;

    /// The non-voided declaration with exactly this submission key
    async fn find_submission(&self, key: &SubmissionKey) -> Result<Option<Declaration>, PortError>;

    /// Every declaration in the person-level scope, oldest first
    async fn find_in_scope(&self, scope: &DuplicateScope) -> Result<Vec<Declaration>, PortError>;

    async fn get_statement(&self, id: StatementId) -> Result<Option<Statement>, PortError>;

    async fn find_statements(&self, query: &StatementQuery) -> Result<Vec<Statement>, PortError>;

    async fn insert_statement(&self, statement: &Statement) -> Result<(), PortError>;

    /// Line items currently on a statement, active or not
    async fn line_items_for_statement(&self, id: StatementId) -> Result<Vec<LineItem>, PortError>;

    async fn line_items_for_declaration(&self, id: DeclarationId) -> Result<Vec<LineItem>, PortError>;

    /// Applies `changes` atomically
    ///
    /// Fails with [`PortError::UniqueViolation`] naming one of
    /// [`constraints`], or [`PortError::PreconditionFailed`] when a
    /// transition's expected state no longer holds. Nothing is written on
    /// failure, and nothing is kept under [`CommitMode::DryRun`].
    async fn commit(&self, changes: ChangeSet, mode: CommitMode) -> Result<CommitReport, PortError>;
}

/// Port for participant and schedule lookups
#[async_trait]
pub trait ParticipantDirectory: DomainPort + HealthCheckable {
    /// The profile the provider declares against for `course`
    async fn resolve_participant(
        &self,
        participant_id: ParticipantIdentityId,
        provider_id: ProviderId,
        course: CourseIdentifier,
    ) -> Result<Option<ParticipantProfile>, PortError>;

    async fn schedule(&self, id: ScheduleId, cohort: Cohort) -> Result<Option<Schedule>, PortError>;
}
