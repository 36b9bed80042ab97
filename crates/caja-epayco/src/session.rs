//! # ePayco Checkout Sessions
//!
//! Creates a hosted checkout session via ePayco's session API and extracts
//! the redirect URL and `ref_payco` reference. Amounts are converted from
//! minor units to the decimal major-unit string ePayco expects here, and
//! nowhere else.

use crate::config::EpaycoConfig;
use crate::webhook;
use async_trait::async_trait;
use caja_core::{
    CustomerInfo, GatewayAdapter, GatewaySession, Order, PaymentError, PaymentMethod,
    PaymentResult, WebhookNotice,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, instrument};

pub const GATEWAY_ID: &str = "epayco";
pub const GATEWAY_LABEL: &str = "Epayco";

/// ePayco gateway adapter (card, PSE bank transfer, Efecty cash voucher)
pub struct EpaycoGateway {
    config: EpaycoConfig,
    client: Client,
}

impl EpaycoGateway {
    /// Create a new adapter. Constructed once at startup and shared.
    pub fn new(config: EpaycoConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn credentials(&self) -> PaymentResult<(&str, &str)> {
        match (
            self.config.public_key.as_deref(),
            self.config.private_key.as_deref(),
        ) {
            (Some(public), Some(private)) => Ok((public, private)),
            _ => Err(PaymentError::NotConfigured {
                gateway: GATEWAY_ID,
            }),
        }
    }

    /// Build the session payload for the ePayco API
    fn build_payload(
        config: &EpaycoConfig,
        public_key: &str,
        order: &Order,
        method: PaymentMethod,
        customer: &CustomerInfo,
    ) -> serde_json::Value {
        let mut payload = json!({
            "public_key": public_key,
            "amount": order.total.major_units_string(),
            "currency": order.total.currency.as_str(),
            "name": format!("Pedido {}", order.id),
            "description": format!("Compra de {} artículo(s)", order.items.len()),
            "invoice": order.id,
            "tax_base": "0",
            "tax": "0",
            "country": "CO",
            "lang": "ES",
            "url_response": format!("{}?order={}", config.response_url, order.id),
            "url_confirmation": config.confirmation_url,
        });

        match method {
            PaymentMethod::Pse => {
                payload["type"] = json!("PSE");
                payload["customer"] = json!({
                    "name": customer.name.as_deref().unwrap_or("Cliente"),
                    "email": customer.email,
                    "phone": customer.phone,
                    "doc_type": customer.doc_type,
                    "doc_number": customer.doc_number,
                });
                if let Some(bank) = &customer.bank {
                    payload["bank"] = json!(bank);
                }
            }
            PaymentMethod::Efecty => {
                payload["type"] = json!("EFECTY");
            }
            PaymentMethod::Card => {
                payload["customer"] = json!({
                    "name": customer.name,
                    "email": customer.email,
                });
            }
            PaymentMethod::Wallet => {}
        }

        payload
    }
}

#[async_trait]
impl GatewayAdapter for EpaycoGateway {
    fn id(&self) -> &'static str {
        GATEWAY_ID
    }

    fn label(&self) -> &'static str {
        GATEWAY_LABEL
    }

    fn supports(&self, method: PaymentMethod) -> bool {
        matches!(
            method,
            PaymentMethod::Card | PaymentMethod::Pse | PaymentMethod::Efecty
        )
    }

    #[instrument(skip(self, order, customer), fields(order_id = %order.id))]
    async fn create_session(
        &self,
        order: &Order,
        method: PaymentMethod,
        customer: &CustomerInfo,
    ) -> PaymentResult<GatewaySession> {
        let (public_key, _) = self.credentials()?;

        if !self.supports(method) {
            return Err(PaymentError::UnsupportedMethod {
                gateway: GATEWAY_ID,
                method: method.to_string(),
            });
        }

        if order.total.minor_units <= 0 {
            return Err(PaymentError::InvalidInput(format!(
                "order {} total must be positive",
                order.id
            )));
        }

        let payload = Self::build_payload(&self.config, public_key, order, method, customer);

        debug!(method = %method, amount = %order.total, "creating ePayco session");

        let url = format!("{}/checkout/v1/session", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Network(e.to_string()))?;

        if !status.is_success() {
            error!("ePayco API error: status={}, body={}", status, body);
            return Err(PaymentError::Provider {
                gateway: GATEWAY_ID,
                message: format!("HTTP {}: {}", status, body),
            });
        }

        // A garbled body from a 2xx response is a provider fault, so the
        // orchestrator can still fall through to the next gateway
        let session: EpaycoSessionResponse =
            serde_json::from_str(&body).map_err(|e| PaymentError::Provider {
                gateway: GATEWAY_ID,
                message: format!("unparseable response body: {}", e),
            })?;

        let data = session.data.unwrap_or_default();

        let redirect_url = data
            .url
            .or(data.url_checkout)
            .ok_or_else(|| PaymentError::Provider {
                gateway: GATEWAY_ID,
                message: "response carried no checkout url".to_string(),
            })?;

        // ref_payco correlates later confirmation webhooks; fall back to the
        // invoice (our order id) when the session API omits it
        let provider_reference = data
            .ref_payco
            .as_ref()
            .and_then(value_to_string)
            .unwrap_or_else(|| order.id.clone());

        info!(reference = %provider_reference, "created ePayco session");

        Ok(GatewaySession {
            gateway: GATEWAY_ID,
            label: GATEWAY_LABEL,
            redirect_url,
            provider_reference,
        })
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> PaymentResult<WebhookNotice> {
        webhook::parse_confirmation(&self.config, payload, signature)
    }
}

/// ePayco sends `ref_payco` sometimes as a number, sometimes as a string
fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =============================================================================
// ePayco API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct EpaycoSessionResponse {
    #[serde(default)]
    #[allow(dead_code)]
    success: Option<bool>,
    #[serde(default)]
    data: Option<EpaycoSessionData>,
}

#[derive(Debug, Default, Deserialize)]
struct EpaycoSessionData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    url_checkout: Option<String>,
    #[serde(default)]
    ref_payco: Option<serde_json::Value>,
}
