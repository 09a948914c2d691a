//! HTTP API Layer
//!
//! This crate provides the REST API for declarations, statements and
//! training record states using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for each domain
//! - **Middleware**: Request tracing and audit logging
//! - **Auth**: The acting lead provider, forwarded by the gateway
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(store, directory, Arc::new(SystemClock), config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::Clock;
use domain_declarations::{DeclarationStore, FundingServices, ParticipantDirectory};

use crate::config::ApiConfig;
use crate::handlers::{declarations, health, statements, training};
use crate::middleware::audit_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: FundingServices,
    pub store: Arc<dyn DeclarationStore>,
    pub directory: Arc<dyn ParticipantDirectory>,
    pub clock: Arc<dyn Clock>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DeclarationStore>,
        directory: Arc<dyn ParticipantDirectory>,
        clock: Arc<dyn Clock>,
        config: ApiConfig,
    ) -> Self {
        let services = FundingServices::new(store.clone(), directory.clone(), clock.clone());
        Self { services, store, directory, clock, config }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let declaration_routes = Router::new()
        .route("/", post(declarations::create_declaration))
        .route("/:id", get(declarations::get_declaration))
        .route("/:id/void", post(declarations::void_declaration))
        .route("/:id/eligible", post(declarations::mark_eligible))
        .route("/:id/clawback", post(declarations::clawback_declaration));

    let statement_routes = Router::new()
        .route("/migrations", post(statements::migrate))
        .route("/:id/payable", post(statements::mark_payable))
        .route("/:id/paid", post(statements::mark_paid));

    let api_routes = Router::new()
        .nest("/declarations", declaration_routes)
        .nest("/statements", statement_routes)
        .route("/training-record-states", post(training::determine_state))
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
