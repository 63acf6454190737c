//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup and carried in an immutable
//! `Config` that gets injected into the web handlers. Nothing reads the
//! environment after process initialization.

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Shared secret for billing provider webhook signatures (X-Signature)
    pub billing_webhook_secret: Option<String>,

    /// Shared secret for identity provider webhook signatures (t=...,v1=...)
    pub identity_webhook_secret: Option<String>,

    /// Billing variant ID for the Pro tier
    pub billing_variant_pro: Option<String>,

    /// Billing variant ID for the Business tier
    pub billing_variant_business: Option<String>,

    /// Maximum age in seconds for identity webhook signature timestamps
    pub identity_signature_max_age: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            billing_webhook_secret: non_empty_var("BILLING_WEBHOOK_SECRET"),

            identity_webhook_secret: non_empty_var("IDENTITY_WEBHOOK_SECRET"),

            billing_variant_pro: non_empty_var("BILLING_VARIANT_PRO"),

            billing_variant_business: non_empty_var("BILLING_VARIANT_BUSINESS"),

            identity_signature_max_age: env::var("IDENTITY_SIGNATURE_MAX_AGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300), // 5 minutes default
        }
    }
}

/// Read an environment variable, treating blank values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
