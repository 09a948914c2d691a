//! Declaration handlers
//!
//! Create, read and void act for the provider named in the request. Marking
//! eligible and clawing back are finance operations and are not scoped to a
//! provider.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use core_kernel::DeclarationId;
use domain_declarations::Declaration;

use crate::auth::ProviderContext;
use crate::dto::{CreateDeclarationBody, DeclarationResponse};
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::AppState;

/// Records a milestone claim
///
/// 201 for a new declaration, 200 when an identical one already exists.
#[instrument(skip(state, body), fields(provider_id = %provider.provider_id))]
pub async fn create_declaration(
    State(state): State<AppState>,
    provider: ProviderContext,
    Json(body): Json<CreateDeclarationBody>,
) -> Result<(StatusCode, Json<DeclarationResponse>), ApiError> {
    let request = body.into_request()?;
    let receipt = state
        .services
        .declarations
        .create_declaration(provider.provider_id, &request)
        .await?;

    let status = if receipt.created {
        info!(declaration_id = %receipt.declaration.id, state = %receipt.declaration.state, "Declaration created");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(receipt.declaration.into())))
}

pub async fn get_declaration(
    State(state): State<AppState>,
    provider: ProviderContext,
    Path(id): Path<String>,
) -> Result<Json<DeclarationResponse>, ApiError> {
    let declaration = owned_declaration(&state, provider, &id).await?;
    Ok(Json(declaration.into()))
}

#[instrument(skip(state), fields(provider_id = %provider.provider_id))]
pub async fn void_declaration(
    State(state): State<AppState>,
    provider: ProviderContext,
    Path(id): Path<String>,
) -> Result<Json<DeclarationResponse>, ApiError> {
    let declaration = owned_declaration(&state, provider, &id).await?;
    let voided = state.services.declarations.void_declaration(declaration.id).await?;
    Ok(Json(voided.into()))
}

#[instrument(skip(state))]
pub async fn mark_eligible(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeclarationResponse>, ApiError> {
    let id: DeclarationId = parse_id(&id, "declaration")?;
    let declaration = state.services.declarations.mark_eligible(id).await?;
    Ok(Json(declaration.into()))
}

#[instrument(skip(state))]
pub async fn clawback_declaration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeclarationResponse>, ApiError> {
    let id: DeclarationId = parse_id(&id, "declaration")?;
    let declaration = state.services.clawbacks.clawback(id).await?;
    Ok(Json(declaration.into()))
}

/// Loads a declaration, hiding other providers' declarations as not found
async fn owned_declaration(
    state: &AppState,
    provider: ProviderContext,
    raw_id: &str,
) -> Result<Declaration, ApiError> {
    let id: DeclarationId = parse_id(raw_id, "declaration")?;
    let declaration = state.services.declarations.get_declaration(id).await?;
    if declaration.provider_id != provider.provider_id {
        return Err(ApiError::NotFound(format!("Declaration {id} not found")));
    }
    Ok(declaration)
}
