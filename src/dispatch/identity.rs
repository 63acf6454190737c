//! Identity provider webhook processing.
//!
//! Handles `invitation.accepted` deliveries: after signature and freshness
//! checks, the accepted invitation is matched against the locally stored
//! pending invitation, the user is created or updated, and the pending
//! record is removed. Redelivery of an already-processed event finds no
//! pending invitation and short-circuits to success, which makes the
//! handler idempotent without any dedupe bookkeeping.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::dispatch::WebhookOutcome;
use crate::store::{NewUser, Store, StoreError};
use crate::web::signature::{verify_timestamped, TimestampedHeader};

/// The only event type this dispatcher acts on.
const HANDLED_EVENT: &str = "invitation.accepted";

/// Invitation payload with the historical field-name variants the provider
/// has used over time. Each logical field coalesces its aliases in order,
/// first non-null wins; coercion to strings happens in [`Self::validate`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInvitationData {
    id: Option<Value>,
    organization_id: Option<Value>,
    #[serde(rename = "organizationId")]
    organization_id_camel: Option<Value>,
    accepted_user_id: Option<Value>,
    #[serde(rename = "acceptedUserId")]
    accepted_user_id_camel: Option<Value>,
    user_id: Option<Value>,
    first_name: Option<Value>,
    #[serde(rename = "firstName")]
    first_name_camel: Option<Value>,
    last_name: Option<Value>,
    #[serde(rename = "lastName")]
    last_name_camel: Option<Value>,
    email: Option<Value>,
}

/// Fully validated invitation fields, required before any side effect runs.
#[derive(Debug)]
struct AcceptedInvitation {
    invitation_id: String,
    organization_id: String,
    accepted_user_id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl RawInvitationData {
    fn validate(self) -> Option<AcceptedInvitation> {
        Some(AcceptedInvitation {
            invitation_id: id_string(self.id)?,
            organization_id: id_string(self.organization_id)
                .or_else(|| id_string(self.organization_id_camel))?,
            accepted_user_id: id_string(self.accepted_user_id)
                .or_else(|| id_string(self.accepted_user_id_camel))
                .or_else(|| id_string(self.user_id))?,
            email: non_empty_string(self.email)?,
            first_name: non_empty_string(self.first_name)
                .or_else(|| non_empty_string(self.first_name_camel)),
            last_name: non_empty_string(self.last_name)
                .or_else(|| non_empty_string(self.last_name_camel)),
        })
    }
}

/// Coerce an identifier the provider sends as either a JSON string or
/// number. Empty strings count as missing, like the billing side.
fn id_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a non-empty JSON string; anything else counts as missing.
fn non_empty_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Process one identity provider webhook delivery.
///
/// `body` must be the raw request body; `signature_header` is the value of
/// the provider's signature header, if present. Side effects only happen
/// after the signature, freshness window, and payload shape have all been
/// validated.
pub async fn process_identity_webhook(
    store: &dyn Store,
    body: &str,
    signature_header: Option<&str>,
    secret: Option<&str>,
    max_age_seconds: u64,
) -> WebhookOutcome {
    let header = match signature_header {
        Some(h) if !h.is_empty() => h,
        _ => return WebhookOutcome::failure(400, "Missing signature header"),
    };

    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => {
            error!("identity_webhook_secret_not_configured");
            return WebhookOutcome::failure(500, "Webhook secret not configured");
        }
    };

    if !verify_timestamped(body, header, secret) {
        warn!("identity_signature_invalid");
        return WebhookOutcome::failure(400, "Invalid signature");
    }

    // Replay window: the timestamp is covered by the signature we just
    // verified, so parse failures here mean a stale or garbled header.
    if !timestamp_is_fresh(header, max_age_seconds) {
        warn!(max_age_seconds, "identity_signature_stale");
        return WebhookOutcome::failure(400, "Signature timestamp outside allowed window");
    }

    let payload: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "identity_webhook_invalid_json");
            return WebhookOutcome::failure(400, "Invalid JSON payload");
        }
    };

    let event_type = payload
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    if event_type != HANDLED_EVENT {
        info!(event = %event_type, "identity_webhook_ignored");
        return WebhookOutcome::success(format!("Ignored event: {}", event_type))
            .with_event(event_type);
    }

    // Every field is an Option<Value>, so this only fails when `data` is
    // not an object at all.
    let data = payload.get("data").cloned().unwrap_or(Value::Null);
    let raw: RawInvitationData = match serde_json::from_value(data) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "identity_webhook_data_not_an_object");
            RawInvitationData::default()
        }
    };

    let invitation = match raw.validate() {
        Some(inv) => inv,
        None => {
            warn!("identity_webhook_invalid_invitation_payload");
            return WebhookOutcome::failure(400, "Invalid invitation payload")
                .with_event(event_type);
        }
    };

    info!(
        invitation_id = %invitation.invitation_id,
        organization_id = %invitation.organization_id,
        email = %invitation.email,
        "identity_invitation_accepted_received"
    );

    let pending = match store
        .pending_invitation_by_external_id(&invitation.invitation_id)
        .await
    {
        Ok(Some(p)) => p,
        Ok(None) => {
            // Already processed (webhook redelivery) or never tracked locally.
            info!(invitation_id = %invitation.invitation_id, "identity_invitation_not_pending");
            return WebhookOutcome::success(format!(
                "Pending invitation not found for ID: {}",
                invitation.invitation_id
            ))
            .with_event(event_type);
        }
        Err(e) => return store_failure(e, &event_type),
    };

    let org = match store
        .organization_by_external_id(&invitation.organization_id)
        .await
    {
        Ok(Some(o)) => o,
        Ok(None) => {
            // The invitation referenced this org, so its absence is a data
            // desync, not a bad request.
            error!(organization_id = %invitation.organization_id, "identity_organization_missing");
            return WebhookOutcome::failure(
                500,
                format!(
                    "Organization not found for ID: {}",
                    invitation.organization_id
                ),
            )
            .with_event(event_type);
        }
        Err(e) => return store_failure(e, &event_type),
    };

    let user_id = match store
        .sync_user_from_invitation(NewUser {
            external_id: invitation.accepted_user_id,
            email: invitation.email.clone(),
            first_name: invitation.first_name,
            last_name: invitation.last_name,
            org_id: org.id,
            role: pending.role,
            customer_id: pending.customer_id,
        })
        .await
    {
        Ok(id) => id,
        Err(e) => return store_failure(e, &event_type),
    };

    if let Err(e) = store
        .delete_pending_invitation(&invitation.invitation_id)
        .await
    {
        return store_failure(e, &event_type);
    }

    info!(user_id = %user_id, email = %invitation.email, "identity_user_synced");

    WebhookOutcome::success(format!("Successfully synced user {}", invitation.email))
        .with_event(event_type)
        .with_user(user_id)
}

fn store_failure(error: StoreError, event: &str) -> WebhookOutcome {
    error!(error = %error, "identity_webhook_store_error");
    WebhookOutcome::failure(500, "Data layer error").with_event(event)
}

/// Check the signed timestamp against the allowed window.
///
/// Clock skew in either direction counts toward the window, matching how
/// the billing side treats webhook timestamps.
fn timestamp_is_fresh(header: &str, max_age_seconds: u64) -> bool {
    let parsed = match TimestampedHeader::parse(header) {
        Some(p) => p,
        None => return false,
    };

    let webhook_time: u64 = match parsed.timestamp.parse() {
        Ok(t) => t,
        Err(_) => return false,
    };

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let age = current_time.abs_diff(webhook_time);
    age <= max_age_seconds
}
