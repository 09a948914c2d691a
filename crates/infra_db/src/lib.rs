//! Infrastructure Database Layer
//!
//! PostgreSQL storage for the declaration domain using SQLx:
//!
//! - [`pool`]: connection pool configuration and the embedded migrations
//! - [`repositories`]: row types and SQL
//! - [`adapters`]: [`DeclarationStore`](domain_declarations::DeclarationStore)
//!   and [`ParticipantDirectory`](domain_declarations::ParticipantDirectory)
//!   implementations
//!
//! The uniqueness rules the domain relies on (one non-voided declaration per
//! submission, one surviving declaration per person and type, one active
//! line item per declaration and intent) are partial unique indexes in the
//! migrations. Their names match `domain_declarations::constraints`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresDeclarationStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/cpd_funding")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresDeclarationStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool, MIGRATOR};
pub use error::DatabaseError;
pub use adapters::{PostgresDeclarationStore, PostgresParticipantDirectory};
