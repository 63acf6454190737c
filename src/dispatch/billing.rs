//! Billing provider webhook processing.
//!
//! Subscription lifecycle events carry the variant ID the customer
//! purchased; the dispatcher resolves it through the plan table and applies
//! the limits to the organization that owns the billing customer. Everything
//! else the provider sends is acknowledged and ignored.

use serde_json::Value;
use tracing::{error, info, warn};

use crate::dispatch::WebhookOutcome;
use crate::plans::PlanTable;
use crate::store::Store;
use crate::web::signature::verify_signature;

/// Process one billing provider webhook delivery.
///
/// `body` must be the raw request body and `signature` the hex digest from
/// the `X-Signature` header, if present.
pub async fn process_billing_webhook(
    store: &dyn Store,
    plans: &PlanTable,
    body: &str,
    signature: Option<&str>,
    secret: Option<&str>,
) -> WebhookOutcome {
    let signature = match signature {
        Some(s) if !s.is_empty() => s,
        _ => return WebhookOutcome::failure(400, "Missing signature header"),
    };

    let secret = match secret {
        Some(s) if !s.is_empty() => s,
        _ => {
            error!("billing_webhook_secret_not_configured");
            return WebhookOutcome::failure(500, "Webhook secret not configured");
        }
    };

    if !verify_signature(signature, body, secret) {
        warn!("billing_signature_invalid");
        return WebhookOutcome::failure(400, "Invalid signature");
    }

    let payload: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "billing_webhook_invalid_json");
            return WebhookOutcome::failure(400, "Invalid JSON payload");
        }
    };

    let event_name = payload
        .pointer("/meta/event_name")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    if event_name != "subscription_created" && event_name != "subscription_updated" {
        info!(event = %event_name, "billing_webhook_ignored");
        return WebhookOutcome::success(format!("Ignored event: {}", event_name))
            .with_event(event_name);
    }

    let attributes = payload.pointer("/data/attributes").unwrap_or(&Value::Null);
    let customer_id = string_field(attributes, "customer_id");
    let variant_id = string_field(attributes, "variant_id");

    let (customer_id, variant_id) = match (customer_id, variant_id) {
        (Some(c), Some(v)) => (c, v),
        _ => {
            warn!(event = %event_name, "billing_webhook_invalid_subscription_payload");
            return WebhookOutcome::failure(400, "Invalid subscription payload")
                .with_event(event_name);
        }
    };

    // Total lookup: unknown variants land on the free tier.
    let limits = plans.limits_for_variant(Some(&variant_id));

    match store.update_organization_plan(&customer_id, limits).await {
        Ok(Some(org_id)) => {
            info!(
                org_id = %org_id,
                customer_id = %customer_id,
                variant_id = %variant_id,
                plan = limits.name,
                "billing_plan_applied"
            );
            WebhookOutcome::success(format!("Applied {} plan", limits.name))
                .with_event(event_name)
        }
        Ok(None) => {
            // The webhook can arrive before the org is provisioned locally;
            // acknowledge and let the subscription sync catch up later.
            warn!(customer_id = %customer_id, "billing_customer_has_no_organization");
            WebhookOutcome::success(format!(
                "No organization for customer: {}",
                customer_id
            ))
            .with_event(event_name)
        }
        Err(e) => {
            error!(error = %e, "billing_webhook_store_error");
            WebhookOutcome::failure(500, "Data layer error").with_event(event_name)
        }
    }
}

/// Read a field that the provider sends as either a JSON string or number.
fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
