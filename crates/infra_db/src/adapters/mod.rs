//! Port adapters backed by PostgreSQL
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresDeclarationStore, PostgresParticipantDirectory};
//! use domain_declarations::FundingServices;
//!
//! let store = Arc::new(PostgresDeclarationStore::new(pool.clone()));
//! let directory = Arc::new(PostgresParticipantDirectory::new(pool));
//! let services = FundingServices::new(store, directory, Arc::new(SystemClock));
//! ```

pub mod declarations;
pub mod participants;

pub use declarations::PostgresDeclarationStore;
pub use participants::PostgresParticipantDirectory;
