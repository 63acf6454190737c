//! Webhook dispatch logic.
//!
//! Each provider gets one entry point that takes the raw request body plus
//! the signature header and walks the request through verification, parsing,
//! and the data-layer calls. Every terminal state is a [`WebhookOutcome`];
//! nothing propagates as an error out of a dispatcher.

pub mod billing;
pub mod identity;

use serde::Serialize;

pub use billing::process_billing_webhook;
pub use identity::process_identity_webhook;

/// Uniform result of processing one webhook delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookOutcome {
    /// Whether the delivery was handled (or benignly ignored)
    pub ok: bool,
    /// HTTP status the caller should return
    pub status: u16,
    /// Human-readable disposition, surfaced to the provider's webhook log
    pub message: String,
    /// Event type, once known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Internal ID of the synced user, on the identity success path
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl WebhookOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            status: 200,
            message: message.into(),
            event: None,
            user_id: None,
        }
    }

    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            message: message.into(),
            event: None,
            user_id: None,
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
