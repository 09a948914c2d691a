//! Port adapters that need no external system
//!
//! The in-memory adapters back the unit tests and the `memory` storage mode
//! of the API server.

pub mod memory;

pub use memory::{InMemoryDeclarationStore, InMemoryParticipantDirectory};
