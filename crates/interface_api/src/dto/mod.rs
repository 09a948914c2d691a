//! Request and response bodies

pub mod declarations;
pub mod statements;
pub mod training;

pub use declarations::{CreateDeclarationBody, DeclarationResponse, StateHistoryEntry};
pub use statements::{MigrationBody, MigrationResponse, PayableResponse, PaymentResponse};
pub use training::TrainingRecordStateBody;
