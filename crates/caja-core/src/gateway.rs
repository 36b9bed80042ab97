//! # Gateway Adapter Trait
//!
//! One adapter per payment provider. An adapter is a pure request/response
//! translator: it turns an internal order into a provider-side session and a
//! provider webhook into a normalized notice. Persistence belongs to the
//! orchestrator and the reconciler, never to the adapter.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                GatewayAdapter (trait)                │
//! │  ├── create_session()                                │
//! │  ├── parse_webhook()                                 │
//! │  └── id() / label() / supports()                     │
//! └──────────────────────────────────────────────────────┘
//!                          ▲
//!              ┌───────────┴───────────┐
//!              │                       │
//!      ┌───────┴───────┐      ┌────────┴─────────┐
//!      │ EpaycoGateway │      │MercadoPagoGateway│
//!      └───────────────┘      └──────────────────┘
//! ```

use crate::error::PaymentResult;
use crate::order::{ClaimedOutcome, CustomerInfo, Order, PaymentMethod};
use async_trait::async_trait;
use std::sync::Arc;

/// A provider-side payment session. Ephemeral: only the reference and the
/// redirect URL survive, persisted onto the order by the orchestrator.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    /// Gateway identifier (e.g. "epayco")
    pub gateway: &'static str,
    /// Display label for the client ("Epayco")
    pub label: &'static str,
    /// URL the customer is redirected to
    pub redirect_url: String,
    /// Provider-assigned reference used to correlate later webhooks
    pub provider_reference: String,
}

/// A provider webhook reduced to the fields the reconciler needs.
#[derive(Debug, Clone)]
pub struct WebhookNotice {
    /// Gateway identifier
    pub gateway: &'static str,
    /// Provider event id, when the payload carries one
    pub event_id: Option<String>,
    /// Order correlation key: the stored provider reference or our order id
    pub order_reference: String,
    /// Normalized claimed outcome
    pub claimed: ClaimedOutcome,
}

/// Core trait for payment provider adapters.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    /// Stable gateway identifier (used in routes and logs)
    fn id(&self) -> &'static str;

    /// Display label shown to the client in the payment option list
    fn label(&self) -> &'static str;

    /// Whether this gateway recognizes the payment method
    fn supports(&self, method: PaymentMethod) -> bool;

    /// Create a provider-side payment session for the order.
    ///
    /// Errors classified by [`crate::PaymentError::is_gateway_skip`]
    /// (`NotConfigured`, `UnsupportedMethod`, `Provider`, `Network`) tell the
    /// orchestrator to move on to the next gateway.
    async fn create_session(
        &self,
        order: &Order,
        method: PaymentMethod,
        customer: &CustomerInfo,
    ) -> PaymentResult<GatewaySession>;

    /// Verify the signature over the raw payload (when a secret is
    /// configured) and extract the order reference and claimed outcome.
    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> PaymentResult<WebhookNotice>;
}

/// Type alias for a shared adapter (dynamic dispatch)
pub type BoxedGatewayAdapter = Arc<dyn GatewayAdapter>;

/// HMAC-SHA256 of `message`, hex-encoded
pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison for signature checks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha256_hex() {
        let sig = hmac_sha256_hex(b"secret", b"payload");
        // 32-byte digest, hex-encoded
        assert_eq!(sig.len(), 64);
        assert_eq!(sig, hmac_sha256_hex(b"secret", b"payload"));
        assert_ne!(sig, hmac_sha256_hex(b"secret", b"payload2"));
        assert_ne!(sig, hmac_sha256_hex(b"other", b"payload"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc123", "abc123"));
        assert!(!constant_time_eq("abc123", "abc124"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
