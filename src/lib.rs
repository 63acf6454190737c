//! CrewSync webhook service.
//!
//! Two narrow server-side responsibilities:
//! - Map billing provider variant IDs to subscription plan limits, with a
//!   free-tier fallback for anything unrecognized.
//! - Verify HMAC-SHA256 signed webhooks from the billing and identity
//!   providers and dispatch verified events to the data layer.
//!
//! ## Request flow
//!
//! ```text
//! POST /webhooks/* → signature verification → JSON parse → event filter
//!                  → data-layer lookups/mutations → structured outcome
//! ```

pub mod config;
pub mod dispatch;
pub mod plans;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{process_billing_webhook, process_identity_webhook, WebhookOutcome};
pub use plans::{PlanLimits, PlanTable, FREE_TIER};
pub use store::{MemoryStore, Store};
pub use web::AppState;
