//! Test Utilities Crate
//!
//! Shared test infrastructure for the CPD funding test suites.
//!
//! # Modules
//!
//! - `fixtures`: fixed instants, ids and the standard 2021 schedule
//! - `builders`: builders for profiles, statements, requests and training inputs
//! - `database`: PostgreSQL testcontainer with migrations applied
//! - `assertions`: assertion helpers for declarations and errors
//! - `generators`: proptest strategies for the funding vocabulary

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
