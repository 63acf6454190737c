//! Web server module for handling inbound webhooks.
//!
//! Receives webhooks from the billing and identity providers, verifies
//! their signatures against the configured shared secrets, and dispatches
//! verified events to the data layer.

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    billing_webhook, health, identity_webhook, AppState, HealthResponse,
    BILLING_SIGNATURE_HEADER, IDENTITY_SIGNATURE_HEADER,
};
pub use signature::{sign_timestamped, verify_signature, verify_timestamped};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/billing", post(billing_webhook))
        .route("/webhooks/identity", post(identity_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
