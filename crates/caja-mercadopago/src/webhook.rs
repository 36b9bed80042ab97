//! # MercadoPago Payment Notifications
//!
//! Notifications arrive at `notification_url` with an `X-MP-Signature`
//! header of the form `ts=<unix>,v1=<hex>`, where `v1` is an HMAC-SHA256
//! over `"{ts}.{raw body}"` keyed by the configured webhook secret.
//! Timestamps outside a 5-minute window are rejected.

use crate::config::MercadoPagoConfig;
use crate::preference::GATEWAY_ID;
use caja_core::{
    constant_time_eq, hmac_sha256_hex, ClaimedOutcome, PaymentError, PaymentResult, WebhookNotice,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

/// Signature timestamp tolerance in seconds
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verify the signature (when a secret is configured) and reduce the
/// notification payload to a normalized notice.
pub fn parse_notification(
    config: &MercadoPagoConfig,
    payload: &[u8],
    signature: Option<&str>,
) -> PaymentResult<WebhookNotice> {
    match (config.webhook_secret.as_deref(), signature) {
        (Some(secret), Some(signature)) => verify_signature(secret, payload, signature)?,
        (Some(_), None) => {
            warn!("MercadoPago notification arrived without a signature header");
        }
        (None, _) => {
            warn!("MercadoPago signature verification DISABLED (MP_WEBHOOK_SECRET not set)");
        }
    }

    let notification: MpNotification = serde_json::from_slice(payload).map_err(|e| {
        PaymentError::Parse(format!("failed to parse MercadoPago notification: {}", e))
    })?;

    let data = notification.data.unwrap_or_default();

    // external_reference is our order id; the preference id resolves through
    // the stored provider reference
    let order_reference = data
        .external_reference
        .or(notification.external_reference)
        .or(data.preference_id)
        .ok_or_else(|| {
            PaymentError::Parse("notification carries no order reference".to_string())
        })?;

    let status = data
        .status
        .or(notification.status)
        .ok_or_else(|| PaymentError::Parse("notification carries no status".to_string()))?;

    let claimed = map_claimed(&status)?;

    let event_id = data.id.as_ref().and_then(|v| match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    Ok(WebhookNotice {
        gateway: GATEWAY_ID,
        event_id,
        order_reference,
        claimed,
    })
}

fn verify_signature(secret: &str, payload: &[u8], header: &str) -> PaymentResult<()> {
    let parts = parse_signature_header(header)?;

    let now = Utc::now().timestamp();
    if (now - parts.timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let signed_payload = format!("{}.{}", parts.timestamp, String::from_utf8_lossy(payload));
    let expected = hmac_sha256_hex(secret.as_bytes(), signed_payload.as_bytes());

    if !parts
        .signatures
        .iter()
        .any(|sig| constant_time_eq(sig, &expected))
    {
        return Err(PaymentError::InvalidSignature(
            "MercadoPago signature mismatch".to_string(),
        ));
    }

    Ok(())
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let kv: Vec<&str> = part.trim().split('=').collect();
        if kv.len() != 2 {
            continue;
        }
        match kv[0] {
            "ts" => {
                timestamp = kv[1].parse().ok();
            }
            "v1" => {
                signatures.push(kv[1].to_string());
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        PaymentError::InvalidSignature("missing timestamp in signature header".to_string())
    })?;

    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature(
            "no v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Map MercadoPago's payment status vocabulary onto the normalized outcome.
fn map_claimed(status: &str) -> PaymentResult<ClaimedOutcome> {
    match status.to_lowercase().as_str() {
        "approved" | "accredited" | "paid" => Ok(ClaimedOutcome::Approved),
        "rejected" | "cancelled" => Ok(ClaimedOutcome::Rejected),
        "pending" | "in_process" | "in_mediation" | "authorized" => Ok(ClaimedOutcome::Pending),
        "failed" | "charged_back" | "refunded" => Ok(ClaimedOutcome::Failed),
        other => Err(PaymentError::Parse(format!(
            "unrecognized MercadoPago status: {}",
            other
        ))),
    }
}

// =============================================================================
// Notification payload shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct MpNotification {
    #[serde(default)]
    data: Option<MpNotificationData>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MpNotificationData {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    external_reference: Option<String>,
    #[serde(default)]
    preference_id: Option<String>,
}
