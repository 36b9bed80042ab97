//! # MercadoPago Checkout Preferences
//!
//! Creates a checkout preference and extracts the `init_point` redirect URL.
//! The preference id becomes the provider reference; the order id travels as
//! `external_reference` so notifications can be correlated either way.

use crate::config::MercadoPagoConfig;
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

pub const GATEWAY_ID: &str = "mercadopago";
pub const GATEWAY_LABEL: &str = "MercadoPago";

/// MercadoPago gateway adapter (wallet and card via the hosted checkout)
pub struct MercadoPagoGateway {
    config: MercadoPagoConfig,
    client: Client,
}

impl MercadoPagoGateway {
    /// Create a new adapter. Constructed once at startup and shared.
    pub fn new(config: MercadoPagoConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn access_token(&self) -> PaymentResult<&str> {
        self.config
            .access_token
            .as_deref()
            .ok_or(PaymentError::NotConfigured {
                gateway: GATEWAY_ID,
            })
    }

    /// Build the preference payload for the MercadoPago API
    fn build_payload(
        config: &MercadoPagoConfig,
        order: &Order,
        customer: &CustomerInfo,
    ) -> PaymentResult<serde_json::Value> {
        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            // unit_price is a JSON number built from the exact decimal
            // string, not a float round-trip. A price that cannot be
            // represented must abort the call, never ship as zero.
            let unit_price: serde_json::Number = item
                .unit_price
                .major_units_string()
                .parse()
                .map_err(|_| {
                    PaymentError::Internal(format!(
                        "unit price of {} is not representable as a JSON number",
                        item.product_id
                    ))
                })?;
            items.push(json!({
                "title": item.name.as_deref().unwrap_or("Producto"),
                "quantity": item.quantity,
                "unit_price": unit_price,
                "currency_id": item.unit_price.currency.as_str(),
            }));
        }

        let thank_you = format!("{}?order={}", config.back_url, order.id);

        let mut payload = json!({
            "items": items,
            "external_reference": order.id,
            "back_urls": {
                "success": thank_you,
                "failure": thank_you,
                "pending": thank_you,
            },
            "notification_url": config.notification_url,
        });

        if let Some(email) = &customer.email {
            payload["payer"] = json!({ "email": email });
        }

        Ok(payload)
    }
}

#[async_trait]
impl GatewayAdapter for MercadoPagoGateway {
    fn id(&self) -> &'static str {
        GATEWAY_ID
    }

    fn label(&self) -> &'static str {
        GATEWAY_LABEL
    }

    fn supports(&self, method: PaymentMethod) -> bool {
        matches!(method, PaymentMethod::Wallet | PaymentMethod::Card)
    }

    #[instrument(skip(self, order, customer), fields(order_id = %order.id))]
    async fn create_session(
        &self,
        order: &Order,
        method: PaymentMethod,
        customer: &CustomerInfo,
    ) -> PaymentResult<GatewaySession> {
        let access_token = self.access_token()?;

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

        let payload = Self::build_payload(&self.config, order, customer)?;

        debug!(method = %method, amount = %order.total, "creating MercadoPago preference");

        let url = format!("{}/checkout/preferences", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
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
            error!("MercadoPago API error: status={}, body={}", status, body);
            return Err(PaymentError::Provider {
                gateway: GATEWAY_ID,
                message: format!("HTTP {}: {}", status, body),
            });
        }

        // A garbled body from a 2xx response is a provider fault, so the
        // orchestrator can still fall through to the next gateway
        let preference: PreferenceResponse =
            serde_json::from_str(&body).map_err(|e| PaymentError::Provider {
                gateway: GATEWAY_ID,
                message: format!("unparseable response body: {}", e),
            })?;

        let redirect_url = preference
            .init_point
            .or(preference.sandbox_init_point)
            .ok_or_else(|| PaymentError::Provider {
                gateway: GATEWAY_ID,
                message: "preference carried no init_point".to_string(),
            })?;

        info!(reference = %preference.id, "created MercadoPago preference");

        Ok(GatewaySession {
            gateway: GATEWAY_ID,
            label: GATEWAY_LABEL,
            redirect_url,
            provider_reference: preference.id,
        })
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> PaymentResult<WebhookNotice> {
        webhook::parse_notification(&self.config, payload, signature)
    }
}

// =============================================================================
// MercadoPago API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    #[serde(default)]
    init_point: Option<String>,
    #[serde(default)]
    sandbox_init_point: Option<String>,
}
