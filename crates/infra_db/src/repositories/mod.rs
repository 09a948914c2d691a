//! Repository implementations
//!
//! Repositories own the SQL and speak in row types; the adapters in
//! [`crate::adapters`] translate rows to and from domain types.

pub mod declarations;
pub mod participants;

pub use declarations::DeclarationRepository;
pub use participants::ParticipantRepository;
