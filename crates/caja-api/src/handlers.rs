//! # Request Handlers
//!
//! Axum request handlers for checkout, order lookup, and the per-provider
//! webhook endpoints.
//!
//! Webhook responses follow the acknowledge-once-durable rule: applied,
//! duplicate, and logically-rejected events all get a 200 `{ok:true}` so the
//! provider stops retrying; only signature failures, unparseable payloads,
//! and unknown orders surface as non-2xx.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use caja_core::{
    CheckoutRequest, Currency, CustomerInfo, LineItem, Money, PaymentError, PaymentMethod,
    PaymentOption, ReconcileOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create checkout request
#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Owning user reference (identity is resolved upstream)
    #[serde(default)]
    pub user_id: Option<String>,
    /// Cart line items with snapshotted prices
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    /// Chosen payment method
    pub payment_method: PaymentMethod,
    /// Customer contact data (PSE needs bank/document fields)
    #[serde(default)]
    pub customer: Option<CustomerInfo>,
}

/// Item in checkout request
#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    /// Product ID
    pub product_id: String,
    /// Display name (optional, shown on the provider page)
    #[serde(default)]
    pub name: Option<String>,
    /// Unit price snapshotted at cart-build time, in minor units
    pub price_minor_units: i64,
    /// Quantity
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Create checkout response
#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    /// Order ID (created even when no gateway produced a redirect)
    pub order_id: String,
    /// Zero or more redirect options for the client
    pub payment_options: Vec<PaymentOption>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, Json<ErrorResponse>) {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "caja",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Create an order and gather payment redirect options
#[instrument(skip(state, request), fields(items = request.items.len()))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let items: Vec<LineItem> = request
        .items
        .into_iter()
        .map(|item| {
            let mut line = LineItem::new(
                item.product_id,
                Money::from_minor(item.price_minor_units, Currency::COP),
                item.quantity,
            );
            if let Some(name) = item.name {
                line = line.with_name(name);
            }
            line
        })
        .collect();

    let checkout = CheckoutRequest {
        user_id: request.user_id.unwrap_or_else(|| "guest".to_string()),
        items,
        payment_method: request.payment_method,
        customer: request.customer.unwrap_or_default(),
    };

    let outcome = state.orchestrator.checkout(checkout).await.map_err(|e| {
        error!("checkout failed: {}", e);
        payment_error_to_response(e)
    })?;

    info!(
        order_id = %outcome.order_id,
        options = outcome.payment_options.len(),
        "checkout complete"
    );

    Ok(Json(CreateCheckoutResponse {
        order_id: outcome.order_id,
        payment_options: outcome.payment_options,
    }))
}

/// Fetch an order (thank-you page polls this for the settled status)
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let order = state
        .store
        .get_order(&order_id)
        .await
        .map_err(payment_error_to_response)?;

    Ok(Json(order))
}

/// Handle an ePayco confirmation webhook
#[instrument(skip(state, headers, body))]
pub async fn epayco_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let signature = header_value(&headers, &["x-epayco-signature", "x-signature"]);
    handle_webhook(&state, caja_epayco::GATEWAY_ID, &body, signature).await
}

/// Handle a MercadoPago payment notification
#[instrument(skip(state, headers, body))]
pub async fn mercadopago_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let signature = header_value(&headers, &["x-mp-signature", "x-signature"]);
    handle_webhook(&state, caja_mercadopago::GATEWAY_ID, &body, signature).await
}

fn header_value<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

/// Shared webhook processing: reconcile, then acknowledge anything that was
/// durably handled.
async fn handle_webhook(
    state: &AppState,
    gateway_id: &str,
    body: &[u8],
    signature: Option<&str>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let outcome = state
        .reconciler
        .apply(gateway_id, body, signature)
        .await
        .map_err(|e| {
            match &e {
                PaymentError::InvalidSignature(_) => {
                    // Security event: tampered or mis-signed delivery
                    warn!(gateway = gateway_id, "webhook rejected: {}", e)
                }
                _ => error!(gateway = gateway_id, "webhook processing failed: {}", e),
            }
            payment_error_to_response(e)
        })?;

    match &outcome {
        ReconcileOutcome::Applied { order_id, status } => {
            info!(gateway = gateway_id, %order_id, %status, "webhook applied");
        }
        ReconcileOutcome::AlreadyApplied { order_id, status } => {
            info!(gateway = gateway_id, %order_id, %status, "webhook duplicate, no-op");
        }
        ReconcileOutcome::RejectedStale {
            order_id,
            status,
            claimed,
        } => {
            // Acknowledged to stop retries, but flagged for operators
            warn!(
                gateway = gateway_id,
                %order_id,
                %status,
                %claimed,
                "webhook acknowledged but transition rejected"
            );
        }
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}
