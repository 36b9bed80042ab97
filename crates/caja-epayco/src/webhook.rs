//! # ePayco Confirmation Webhooks
//!
//! ePayco posts a confirmation to `url_confirmation` when a payment settles.
//! The signature is an HMAC-SHA256 of the raw body, hex-encoded, in the
//! `X-Epayco-Signature` header; the private key is the shared secret.
//!
//! Field names vary between the session API confirmation (`data.order_id`,
//! `data.status`) and the classic checkout confirmation (`x_id_invoice`,
//! `x_transaction_state`, `x_ref_payco`); both shapes are accepted.

use crate::config::EpaycoConfig;
use crate::session::GATEWAY_ID;
use caja_core::{
    constant_time_eq, hmac_sha256_hex, ClaimedOutcome, PaymentError, PaymentResult, WebhookNotice,
};
use serde::Deserialize;
use tracing::warn;

/// Verify the signature (when a secret is configured) and reduce the
/// confirmation payload to a normalized notice.
pub fn parse_confirmation(
    config: &EpaycoConfig,
    payload: &[u8],
    signature: Option<&str>,
) -> PaymentResult<WebhookNotice> {
    match (config.private_key.as_deref(), signature) {
        (Some(secret), Some(signature)) => {
            let expected = hmac_sha256_hex(secret.as_bytes(), payload);
            if !constant_time_eq(signature, &expected) {
                return Err(PaymentError::InvalidSignature(
                    "ePayco signature mismatch".to_string(),
                ));
            }
        }
        (Some(_), None) => {
            warn!("ePayco confirmation arrived without a signature header");
        }
        (None, _) => {
            // Development mode: explicitly logged, never silently equal to
            // "verified"
            warn!("ePayco signature verification DISABLED (EPAYCO_PRIVATE_KEY not set)");
        }
    }

    let confirmation: EpaycoConfirmation = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::Parse(format!("failed to parse ePayco confirmation: {}", e)))?;

    let data = confirmation.data.unwrap_or_default();

    let order_reference = data
        .order_id
        .or(confirmation.x_id_invoice)
        .or_else(|| confirmation.x_ref_payco.as_ref().and_then(value_to_string))
        .ok_or_else(|| {
            PaymentError::Parse("confirmation carries no order reference".to_string())
        })?;

    let status = data
        .status
        .or(confirmation.status)
        .or(confirmation.x_transaction_state)
        .ok_or_else(|| PaymentError::Parse("confirmation carries no status".to_string()))?;

    let claimed = map_claimed(&status)?;

    let event_id = confirmation
        .x_ref_payco
        .as_ref()
        .and_then(value_to_string)
        .or_else(|| data.ref_payco.as_ref().and_then(value_to_string));

    Ok(WebhookNotice {
        gateway: GATEWAY_ID,
        event_id,
        order_reference,
        claimed,
    })
}

/// Map ePayco's status vocabulary (Spanish labels, English labels, and
/// numeric transaction-state codes) onto the normalized outcome.
fn map_claimed(status: &str) -> PaymentResult<ClaimedOutcome> {
    match status.to_lowercase().as_str() {
        "aceptada" | "approved" | "paid" | "1" => Ok(ClaimedOutcome::Approved),
        "rechazada" | "rejected" | "cancelada" | "cancelled" | "2" => Ok(ClaimedOutcome::Rejected),
        "pendiente" | "pending" | "3" => Ok(ClaimedOutcome::Pending),
        "fallida" | "failed" | "abandonada" | "4" => Ok(ClaimedOutcome::Failed),
        other => Err(PaymentError::Parse(format!(
            "unrecognized ePayco status: {}",
            other
        ))),
    }
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =============================================================================
// Confirmation payload shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct EpaycoConfirmation {
    #[serde(default)]
    data: Option<EpaycoConfirmationData>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    x_ref_payco: Option<serde_json::Value>,
    #[serde(default)]
    x_id_invoice: Option<String>,
    #[serde(default)]
    x_transaction_state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EpaycoConfirmationData {
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    ref_payco: Option<serde_json::Value>,
}
