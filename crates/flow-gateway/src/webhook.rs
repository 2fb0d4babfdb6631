//! # Webhook Verification
//!
//! Validates inbound gateway notifications before any business field is
//! parsed. Fails closed: a bad signature rejects the request and no
//! state is touched downstream.
//!
//! Signature scheme: header `t=<unix>,v1=<hex>` where the hex value is
//! HMAC-SHA256 over `"{t}.{body}"` with the shared webhook secret.

use flow_core::{AttemptOutcome, PaymentError, PaymentResult};
use serde::Deserialize;
use tracing::debug;

/// Accepted clock skew between the gateway's timestamp and ours
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// A verified, parsed gateway notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayNotification {
    /// Gateway-issued event ID, used as the dedup key
    pub dedup_key: String,
    /// Reference of the payment attempt the event concerns
    pub gateway_reference: String,
    /// Outcome carried by the event
    pub outcome: AttemptOutcome,
}

/// Verifies webhook signatures against the shared secret
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify the signature header and parse the notification.
    ///
    /// Verification runs before any parsing of business fields. Returns
    /// `SignatureInvalid` on any authenticity failure and `WebhookParse`
    /// if the verified body is malformed.
    pub fn verify(&self, payload: &[u8], signature: &str) -> PaymentResult<GatewayNotification> {
        let sig_parts = parse_signature_header(signature)?;

        let now = chrono::Utc::now().timestamp();
        if (now - sig_parts.timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
            return Err(PaymentError::SignatureInvalid(
                "timestamp outside tolerance".to_string(),
            ));
        }

        let signed_payload = format!(
            "{}.{}",
            sig_parts.timestamp,
            String::from_utf8_lossy(payload)
        );
        let expected = compute_hmac_sha256(&self.secret, &signed_payload);

        let valid = sig_parts
            .signatures
            .iter()
            .any(|sig| constant_time_compare(sig, &expected));
        if !valid {
            return Err(PaymentError::SignatureInvalid(
                "signature mismatch".to_string(),
            ));
        }

        parse_notification(payload)
    }
}

fn parse_notification(payload: &[u8]) -> PaymentResult<GatewayNotification> {
    let event: GatewayEvent = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::WebhookParse(format!("failed to parse event: {}", e)))?;

    let outcome = match event.event_type.as_str() {
        "payment_intent.succeeded" => AttemptOutcome::Succeeded,
        "payment_intent.payment_failed" => AttemptOutcome::Failed,
        "payment_intent.canceled" => AttemptOutcome::Cancelled,
        other => {
            debug!(event_type = other, "unhandled event type, deriving outcome from object status");
            match event.data.object.status.as_deref() {
                Some("succeeded") => AttemptOutcome::Succeeded,
                Some("failed") | Some("payment_failed") => AttemptOutcome::Failed,
                Some("canceled") | Some("cancelled") => AttemptOutcome::Cancelled,
                _ => AttemptOutcome::Pending,
            }
        }
    };

    Ok(GatewayNotification {
        dedup_key: event.id,
        gateway_reference: event.data.object.id,
        outcome,
    })
}

/// Build a signature header for a payload. Counterpart of `verify`;
/// used by tests and local webhook simulation.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let sig = compute_hmac_sha256(secret, &signed_payload);
    format!("t={},v1={}", timestamp, sig)
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GatewayEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: GatewayEventData,
}

#[derive(Debug, Deserialize)]
struct GatewayEventData {
    object: GatewayEventObject,
}

#[derive(Debug, Deserialize)]
struct GatewayEventObject {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

// =============================================================================
// Signature Primitives
// =============================================================================

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let kv: Vec<&str> = part.split('=').collect();
        if kv.len() != 2 {
            continue;
        }
        match kv[0] {
            "t" => {
                timestamp = kv[1].parse().ok();
            }
            "v1" => {
                signatures.push(kv[1].to_string());
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        PaymentError::SignatureInvalid("missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(PaymentError::SignatureInvalid(
            "no v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
