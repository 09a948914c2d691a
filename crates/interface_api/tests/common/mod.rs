//! Shared harness for the API tests
//!
//! Builds the router over in-memory adapters seeded with the 2021 fixture
//! schedule, one fundable participant and two output-fee statements for
//! the fixture provider.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use core_kernel::{FixedClock, ProviderId};
use domain_declarations::adapters::{InMemoryDeclarationStore, InMemoryParticipantDirectory};
use domain_declarations::{DeclarationRequest, ParticipantProfile, Statement};
use interface_api::auth::PROVIDER_HEADER;
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{
    IdFixtures, ParticipantProfileBuilder, ScheduleFixtures, StatementBuilder, StringFixtures,
    TemporalFixtures,
};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryDeclarationStore>,
    pub directory: Arc<InMemoryParticipantDirectory>,
    pub clock: FixedClock,
    pub profile: ParticipantProfile,
    pub november: Statement,
    pub december: Statement,
}

impl TestApp {
    pub async fn new() -> Self {
        let november = StatementBuilder::new().build();
        let december = StatementBuilder::new()
            .named(StringFixtures::december_statement())
            .with_deadline(TemporalFixtures::december_deadline())
            .build();
        let store = Arc::new(
            InMemoryDeclarationStore::with_statements(vec![november.clone(), december.clone()]).await,
        );

        let directory = Arc::new(InMemoryParticipantDirectory::new());
        directory.add_schedule(ScheduleFixtures::ecf_september()).await;
        let profile = ParticipantProfileBuilder::new().build();
        directory.add_profile(profile.clone()).await;

        let clock = TemporalFixtures::clock();
        let state = AppState::new(
            store.clone(),
            directory.clone(),
            Arc::new(clock.clone()),
            ApiConfig::default(),
        );

        Self {
            router: create_router(state),
            store,
            directory,
            clock,
            profile,
            november,
            december,
        }
    }

    pub async fn add_profile(&self, profile: ParticipantProfile) {
        self.directory.add_profile(profile).await;
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// Submits `request` as the fixture provider
    pub async fn declare(&self, request: &DeclarationRequest) -> (StatusCode, Value) {
        self.send(post_json(
            "/api/v1/declarations",
            Some(IdFixtures::provider_id()),
            serde_json::to_value(request).unwrap(),
        ))
        .await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, Value) {
        self.send(post_json(uri, None, Value::Null)).await
    }

    pub async fn post_as(&self, uri: &str, provider: ProviderId) -> (StatusCode, Value) {
        self.send(post_json(uri, Some(provider), Value::Null)).await
    }

    pub async fn get_as(&self, uri: &str, provider: ProviderId) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .header(PROVIDER_HEADER, provider.to_string())
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}

pub fn post_json(uri: &str, provider: Option<ProviderId>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(provider) = provider {
        builder = builder.header(PROVIDER_HEADER, provider.to_string());
    }
    let body = if body.is_null() {
        Body::empty()
    } else {
        Body::from(body.to_string())
    };
    builder.body(body).unwrap()
}

pub fn id_of(body: &Value) -> String {
    body["id"].as_str().unwrap().to_string()
}
