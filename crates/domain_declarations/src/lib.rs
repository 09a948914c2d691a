//! Declaration Domain - Milestone claims and their settlement
//!
//! This crate provides:
//! - Course vocabulary, schedules and milestone windows
//! - The declaration aggregate and its state machine
//! - Duplicate resolution across participant profiles
//! - Statements, line items and the ledger that writes them
//! - The clawback workflow for paid declarations
//! - Store and directory ports with in-memory adapters

pub mod course;
pub mod schedule;
pub mod participant;
pub mod declaration;
pub mod duplicates;
pub mod statement;
pub mod line_item;
pub mod changeset;
pub mod error;
pub mod ports;
pub mod adapters;
pub mod ledger;
pub mod clawback;
pub mod lifecycle;
pub mod services;

pub use course::{CourseIdentifier, DeclarationType, EvidenceHeld, UnknownValue};
pub use schedule::{Cohort, Milestone, Schedule};
pub use participant::{ParticipantProfile, ProfileStatus};
pub use declaration::{
    Declaration, DeclarationDraft, DeclarationState, DeclarationStateRecord, DuplicateScope,
    InitialState, StateReason, StateTransition, SubmissionKey,
};
pub use statement::{Statement, StatementQuery, StatementUpdate};
pub use line_item::{LineItem, LineItemIntent};
pub use changeset::{ChangeSet, CommitMode, CommitReport, DeadlineCheck, LineItemMove, MoveOutcome};
pub use error::{DeclarationError, FieldError, FieldErrorCode, RuleViolation};
pub use ports::{constraints, DeclarationStore, ParticipantDirectory};
pub use ledger::{Ledger, MigrationOutcome, MigrationRequest, PaymentSummary};
pub use clawback::ClawbackWorkflow;
pub use lifecycle::{DeclarationReceipt, DeclarationRequest, DeclarationService};
pub use services::FundingServices;
