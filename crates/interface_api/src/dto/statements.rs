//! Statement DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ProviderId, StatementId};
use domain_declarations::{
    Cohort, DeclarationType, MigrationOutcome, MigrationRequest, PaymentSummary, StatementUpdate,
};

use crate::error::ApiError;

fn default_dry_run() -> bool {
    true
}

/// Body of `POST /api/v1/statements/migrations`
///
/// Runs as a dry run unless `dry_run` is explicitly `false`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MigrationBody {
    #[validate(range(min = 2020, max = 2099, message = "The cohort must be a start year"))]
    pub cohort: i32,
    #[validate(length(min = 1, message = "The from_statement_name is required"))]
    pub from_statement_name: String,
    #[validate(length(min = 1, message = "The to_statement_name is required"))]
    pub to_statement_name: String,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// Restricts the migration to these providers
    #[serde(default)]
    #[validate(length(min = 1, message = "Give at least one provider or omit provider_ids"))]
    pub provider_ids: Option<Vec<ProviderId>>,
    /// Restricts the moved line items to these declaration types
    #[serde(default)]
    #[validate(length(min = 1, message = "Give at least one type or omit declaration_types"))]
    pub declaration_types: Option<Vec<DeclarationType>>,
    #[serde(default)]
    pub to_statement_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to_statement_output_fee: Option<bool>,
    #[serde(default)]
    pub from_statement_output_fee: Option<bool>,
}

impl MigrationBody {
    pub fn into_request(self) -> Result<MigrationRequest, ApiError> {
        self.validate()?;

        let mut request = MigrationRequest::new(
            Cohort(self.cohort),
            self.from_statement_name,
            self.to_statement_name,
        )
        .dry_run(self.dry_run)
        .with_to_statement_updates(StatementUpdate {
            deadline: self.to_statement_deadline,
            output_fee: self.to_statement_output_fee,
            ..StatementUpdate::default()
        });

        if let Some(providers) = self.provider_ids {
            request = request.for_providers(providers);
        }
        if let Some(types) = self.declaration_types {
            request = request.for_declaration_types(types);
        }
        if let Some(output_fee) = self.from_statement_output_fee {
            request = request.with_from_statement_output_fee(output_fee);
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResponse {
    /// False once the changes were committed
    pub dry_run: bool,
    pub log: Vec<String>,
    /// Line items moved, summed over every provider
    pub moved: usize,
    pub statements_updated: usize,
}

impl From<MigrationOutcome> for MigrationResponse {
    fn from(outcome: MigrationOutcome) -> Self {
        Self {
            dry_run: outcome.report.rolled_back,
            moved: outcome.report.moves.iter().map(|m| m.moved).sum(),
            statements_updated: outcome.report.statements_updated,
            log: outcome.log,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayableResponse {
    pub statement_id: StatementId,
    pub marked_payable: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub statement_id: StatementId,
    pub paid: usize,
    pub clawed_back: usize,
}

impl PaymentResponse {
    pub fn new(statement_id: StatementId, summary: PaymentSummary) -> Self {
        Self {
            statement_id,
            paid: summary.paid,
            clawed_back: summary.clawed_back,
        }
    }
}
