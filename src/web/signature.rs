//! Webhook signature verification.
//!
//! Two HMAC-SHA256 schemes are supported:
//!
//! - The billing provider sends a plain hex digest of the raw request body
//!   in the `X-Signature` header.
//! - The identity provider sends a timestamped header of the form
//!   `t=<unix-seconds>,v1=<hex-digest>`, where the digest covers
//!   `"<t>.<payload>"`.
//!
//! Both verifiers must be given the exact raw request body; re-serializing
//! parsed JSON invalidates the signature. All internal failures (empty
//! inputs, key import errors) are converted to `false`, never propagated.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Compute the lowercase-hex HMAC-SHA256 digest of `message` under `secret`.
fn hmac_sha256_hex(secret: &str, message: &str) -> Option<String> {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("hmac_invalid_key");
            return None;
        }
    };

    mac.update(message.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a plain HMAC-SHA256 signature over the raw request body.
///
/// Used for the billing provider's `X-Signature` header. Returns `true` only
/// if `signature` equals the hex digest of `body` under `secret`.
pub fn verify_signature(signature: &str, body: &str, secret: &str) -> bool {
    if signature.is_empty() || secret.is_empty() {
        warn!(
            has_signature = !signature.is_empty(),
            has_secret = !secret.is_empty(),
            "billing_signature_missing_fields"
        );
        return false;
    }

    let expected = match hmac_sha256_hex(secret, body) {
        Some(d) => d,
        None => return false,
    };

    constant_time_compare(&expected, signature)
}

/// Parsed `t=...,v1=...` signature header.
///
/// Both fields are required; a header missing either is rejected before any
/// cryptographic work runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedHeader {
    /// Unix epoch seconds when the provider signed the payload
    pub timestamp: String,
    /// Hex HMAC-SHA256 digest of `"<timestamp>.<payload>"`
    pub digest: String,
}

impl TimestampedHeader {
    /// Parse a comma-separated `key=value` header.
    ///
    /// Splits on `,` then on the first `=` per segment. Returns `None` when
    /// either the `t` or `v1` field is absent.
    pub fn parse(header: &str) -> Option<Self> {
        let mut timestamp = None;
        let mut digest = None;

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value.to_string()),
                Some(("v1", value)) => digest = Some(value.to_string()),
                _ => {}
            }
        }

        Some(Self {
            timestamp: timestamp?,
            digest: digest?,
        })
    }
}

/// Produce a timestamped signature header for `payload`.
///
/// Returns `"t=<timestamp>,v1=<hex-digest>"` with the digest computed over
/// `"<timestamp>.<payload>"`. Exposed for test fixtures and ops tooling; the
/// inbound path only verifies.
pub fn sign_timestamped(payload: &str, secret: &str, timestamp_seconds: u64) -> Option<String> {
    let signed_payload = format!("{}.{}", timestamp_seconds, payload);
    let digest = hmac_sha256_hex(secret, &signed_payload)?;
    Some(format!("t={},v1={}", timestamp_seconds, digest))
}

/// Verify a timestamped signature header over the raw request body.
///
/// Fails closed on a malformed header. The embedded timestamp is covered by
/// the signature but is not checked for freshness here; the webhook
/// dispatcher enforces the replay window separately.
pub fn verify_timestamped(payload: &str, header: &str, secret: &str) -> bool {
    if header.is_empty() || secret.is_empty() {
        warn!(
            has_header = !header.is_empty(),
            has_secret = !secret.is_empty(),
            "identity_signature_missing_fields"
        );
        return false;
    }

    let parsed = match TimestampedHeader::parse(header) {
        Some(p) => p,
        None => {
            warn!("identity_signature_malformed_header");
            return false;
        }
    };

    let signed_payload = format!("{}.{}", parsed.timestamp, payload);
    let expected = match hmac_sha256_hex(secret, &signed_payload) {
        Some(d) => d,
        None => return false,
    };

    constant_time_compare(&expected, &parsed.digest)
}

/// Constant-time string comparison to prevent timing attacks.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_digest(secret: &str, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature_valid() {
        let body = r#"{"meta":{"event_name":"subscription_created"}}"#;
        let digest = plain_digest("billing-secret", body);
        assert!(verify_signature(&digest, body, "billing-secret"));
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let body = "payload";
        let digest = plain_digest("right-secret", body);
        assert!(!verify_signature(&digest, body, "wrong-secret"));
    }

    #[test]
    fn test_verify_signature_tampered_body() {
        let digest = plain_digest("secret", "payload");
        assert!(!verify_signature(&digest, "payloae", "secret"));
    }

    #[test]
    fn test_verify_signature_tampered_digest() {
        let body = "payload";
        let mut digest = plain_digest("secret", body);
        // Flip one hex character
        let last = digest.pop().unwrap();
        digest.push(if last == '0' { '1' } else { '0' });
        assert!(!verify_signature(&digest, body, "secret"));
    }

    #[test]
    fn test_verify_signature_empty_inputs() {
        assert!(!verify_signature("", "body", "secret"));
        assert!(!verify_signature("abc", "body", ""));
    }

    #[test]
    fn test_timestamped_round_trip() {
        for (payload, secret, ts) in [
            ("{}", "secret", 0u64),
            (r#"{"event":"invitation.accepted"}"#, "another-secret", 1_700_000_000),
            ("", "s", 42),
        ] {
            let header = sign_timestamped(payload, secret, ts).unwrap();
            assert!(verify_timestamped(payload, &header, secret));
        }
    }

    #[test]
    fn test_timestamped_header_format() {
        let header = sign_timestamped("body", "secret", 1_700_000_000).unwrap();
        assert!(header.starts_with("t=1700000000,v1="));
        let parsed = TimestampedHeader::parse(&header).unwrap();
        assert_eq!(parsed.timestamp, "1700000000");
        assert_eq!(parsed.digest.len(), 64);
    }

    #[test]
    fn test_timestamped_tampered_payload() {
        let header = sign_timestamped("payload", "secret", 1_700_000_000).unwrap();
        assert!(!verify_timestamped("payloae", &header, "secret"));
    }

    #[test]
    fn test_timestamped_wrong_secret() {
        let header = sign_timestamped("payload", "secret", 1_700_000_000).unwrap();
        assert!(!verify_timestamped("payload", &header, "other"));
    }

    #[test]
    fn test_timestamped_tampered_timestamp() {
        let header = sign_timestamped("payload", "secret", 1_700_000_000).unwrap();
        let tampered = header.replace("t=1700000000", "t=1700000001");
        assert!(!verify_timestamped("payload", &tampered, "secret"));
    }

    #[test]
    fn test_timestamped_missing_fields_fail_closed() {
        assert!(!verify_timestamped("payload", "t=1700000000", "secret"));
        assert!(!verify_timestamped("payload", "v1=abcdef", "secret"));
        assert!(!verify_timestamped("payload", "not-a-header", "secret"));
        assert!(!verify_timestamped("payload", "", "secret"));
    }

    #[test]
    fn test_header_parse_ignores_unknown_segments() {
        let parsed = TimestampedHeader::parse("t=123,v0=old,v1=abc").unwrap();
        assert_eq!(parsed.timestamp, "123");
        assert_eq!(parsed.digest, "abc");
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(constant_time_compare("", ""));
    }
}
