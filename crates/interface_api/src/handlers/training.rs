//! Training record state handler

use axum::{extract::State, Json};

use domain_training::{determine_at, TrainingRecordState};

use crate::dto::TrainingRecordStateBody;
use crate::error::ApiError;
use crate::AppState;

pub async fn determine_state(
    State(state): State<AppState>,
    Json(body): Json<TrainingRecordStateBody>,
) -> Result<Json<TrainingRecordState>, ApiError> {
    let result = determine_at(
        &body.profile,
        body.induction_record.as_ref(),
        body.delivery_partner_id,
        body.school_id,
        state.clock.now(),
    )?;
    Ok(Json(result))
}
