//! Statement handlers

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use core_kernel::StatementId;

use crate::dto::{MigrationBody, MigrationResponse, PayableResponse, PaymentResponse};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::AppState;

/// Moves line items between two named statements for each provider
#[instrument(skip(state, body), fields(from = %body.from_statement_name, to = %body.to_statement_name))]
pub async fn migrate(
    State(state): State<AppState>,
    Json(body): Json<MigrationBody>,
) -> Result<Json<MigrationResponse>, ApiError> {
    let request = body.into_request()?;
    let outcome = state.services.ledger.migrate(request).await?;
    let response = MigrationResponse::from(outcome);
    info!(moved = response.moved, dry_run = response.dry_run, "Statement migration finished");
    Ok(Json(response))
}

pub async fn mark_payable(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PayableResponse>, ApiError> {
    let statement_id: StatementId = parse_id(&id, "statement")?;
    let marked_payable = state.services.ledger.mark_payable(statement_id).await?;
    Ok(Json(PayableResponse { statement_id, marked_payable }))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let statement_id: StatementId = parse_id(&id, "statement")?;
    let summary = state.services.ledger.mark_paid(statement_id).await?;
    Ok(Json(PaymentResponse::new(statement_id, summary)))
}
