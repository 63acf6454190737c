//! Webhook endpoint handlers.
//!
//! The handlers stay thin: pull the signature header, hand the raw body to
//! the dispatcher, and translate the outcome into an HTTP response. The body
//! is taken as the raw request string before any JSON parsing so that
//! signature verification sees the exact bytes the provider signed.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::dispatch::{process_billing_webhook, process_identity_webhook, WebhookOutcome};
use crate::plans::PlanTable;
use crate::store::Store;

/// Header carrying the billing provider's hex HMAC digest.
pub const BILLING_SIGNATURE_HEADER: &str = "X-Signature";

/// Header carrying the identity provider's `t=...,v1=...` signature.
pub const IDENTITY_SIGNATURE_HEADER: &str = "X-Event-Signature";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub plans: Arc<PlanTable>,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Self {
        let plans = PlanTable::new(
            config.billing_variant_pro.as_deref(),
            config.billing_variant_business.as_deref(),
        );
        Self {
            config: Arc::new(config),
            plans: Arc::new(plans),
            store,
        }
    }
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Billing provider webhook endpoint.
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    info!(
        body_length = body.len(),
        has_signature = headers.contains_key(BILLING_SIGNATURE_HEADER),
        "billing_webhook_received"
    );

    let signature = header_value(&headers, BILLING_SIGNATURE_HEADER);

    let outcome = process_billing_webhook(
        state.store.as_ref(),
        &state.plans,
        &body,
        signature,
        state.config.billing_webhook_secret.as_deref(),
    )
    .await;

    respond(outcome)
}

/// Identity provider webhook endpoint.
pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    info!(
        body_length = body.len(),
        has_signature = headers.contains_key(IDENTITY_SIGNATURE_HEADER),
        "identity_webhook_received"
    );

    let signature = header_value(&headers, IDENTITY_SIGNATURE_HEADER);

    let outcome = process_identity_webhook(
        state.store.as_ref(),
        &body,
        signature,
        state.config.identity_webhook_secret.as_deref(),
        state.config.identity_signature_max_age,
    )
    .await;

    respond(outcome)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn respond(outcome: WebhookOutcome) -> (StatusCode, Json<WebhookOutcome>) {
    let status =
        StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_maps_status() {
        let (status, _) = respond(WebhookOutcome::success("done"));
        assert_eq!(status, StatusCode::OK);

        let (status, _) = respond(WebhookOutcome::failure(400, "bad"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = respond(WebhookOutcome::failure(500, "broken"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_header_value_missing() {
        let headers = HeaderMap::new();
        assert_eq!(header_value(&headers, BILLING_SIGNATURE_HEADER), None);
    }

    #[test]
    fn test_app_state_builds_plan_table_from_config() {
        let config = Config {
            port: 8080,
            billing_webhook_secret: None,
            identity_webhook_secret: None,
            billing_variant_pro: Some("variant-pro".to_string()),
            billing_variant_business: None,
            identity_signature_max_age: 300,
        };
        let state = AppState::new(config, crate::store::MemoryStore::new());
        assert_eq!(state.plans.plan_name(Some("variant-pro")), "Pro");
        assert_eq!(state.plans.plan_name(Some("anything-else")), "Free");
    }
}
