//! Caller identity
//!
//! Lead providers authenticate with the gateway in front of this service.
//! The gateway forwards the authenticated provider in the `x-provider-id`
//! header; [`ProviderContext`] reads it and rejects requests without one.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use core_kernel::ProviderId;

use crate::error::ApiError;

/// Header carrying the authenticated lead provider
pub const PROVIDER_HEADER: &str = "x-provider-id";

/// The lead provider a request acts for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderContext {
    pub provider_id: ProviderId,
}

#[async_trait]
impl<S> FromRequestParts<S> for ProviderContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(PROVIDER_HEADER) else {
            warn!("Missing {} header", PROVIDER_HEADER);
            return Err(ApiError::Unauthorized(format!("Missing {PROVIDER_HEADER} header")));
        };

        value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<ProviderId>().ok())
            .map(|provider_id| ProviderContext { provider_id })
            .ok_or_else(|| {
                warn!("Invalid {} header", PROVIDER_HEADER);
                ApiError::Unauthorized(format!("Invalid {PROVIDER_HEADER} header"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<ProviderContext, ApiError> {
        let mut builder = Request::builder().uri("/api/v1/declarations");
        if let Some(value) = header {
            builder = builder.header(PROVIDER_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ProviderContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_accepts_prefixed_and_bare_ids() {
        let provider = ProviderId::new();

        let prefixed = extract(Some(&provider.to_string())).await.unwrap();
        let bare = extract(Some(&provider.as_uuid().to_string())).await.unwrap();

        assert_eq!(prefixed.provider_id, provider);
        assert_eq!(bare.provider_id, provider);
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        assert!(matches!(extract(None).await, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_garbage_header_is_unauthorized() {
        assert!(matches!(extract(Some("acme")).await, Err(ApiError::Unauthorized(_))));
    }
}
