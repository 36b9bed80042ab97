//! # Routes
//!
//! Axum router configuration for the order/payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - API:
///   - POST /api/v1/checkout - Create an order and payment options
///   - GET  /api/v1/orders/{order_id} - Get order by ID
///
/// - Webhooks:
///   - POST /webhook/epayco - ePayco confirmation handler
///   - POST /webhook/mercadopago - MercadoPago notification handler
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - the storefront is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/checkout", post(handlers::create_checkout))
        .route("/orders/{order_id}", get(handlers::get_order));

    // Webhook routes (no CORS, must accept raw body)
    let webhook_routes = Router::new()
        .route("/epayco", post(handlers::epayco_webhook))
        .route("/mercadopago", post(handlers::mercadopago_webhook));

    Router::new()
        // Health check at root
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        // API v1
        .nest("/api/v1", api_routes)
        // Webhooks
        .nest("/webhook", webhook_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use axum_test::TestServer;
    use caja_core::{BoxedGatewayAdapter, MemoryOrderStore, OrderStore};
    use caja_epayco::{EpaycoConfig, EpaycoGateway};
    use serde_json::json;
    use std::sync::Arc;

    fn test_state(gateways: Vec<BoxedGatewayAdapter>) -> AppState {
        let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
        let config = AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            base_url: "http://localhost:8080".to_string(),
            environment: "test".to_string(),
        };
        AppState::with_parts(store, gateways, config)
    }

    fn unconfigured_epayco() -> BoxedGatewayAdapter {
        Arc::new(EpaycoGateway::new(EpaycoConfig::unconfigured(
            "http://localhost:8080",
        )))
    }

    #[tokio::test]
    async fn test_health() {
        let server = TestServer::new(create_router(test_state(vec![]))).unwrap();

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_checkout_without_gateways_keeps_order_pending() {
        let server =
            TestServer::new(create_router(test_state(vec![unconfigured_epayco()]))).unwrap();

        let response = server
            .post("/api/v1/checkout")
            .json(&json!({
                "user_id": "user-1",
                "items": [
                    {"product_id": "p-1", "name": "Camiseta", "price_minor_units": 5_000_00, "quantity": 2}
                ],
                "payment_method": "card"
            }))
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        let order_id = body["order_id"].as_str().unwrap().to_string();
        assert_eq!(body["payment_options"].as_array().unwrap().len(), 0);

        let order = server.get(&format!("/api/v1/orders/{}", order_id)).await;
        order.assert_status_ok();

        let order: serde_json::Value = order.json();
        assert_eq!(order["status"], "pending");
        assert_eq!(order["total"]["minor_units"], 10_000_00);
    }

    #[tokio::test]
    async fn test_epayco_webhook_marks_order_paid() {
        let server =
            TestServer::new(create_router(test_state(vec![unconfigured_epayco()]))).unwrap();

        let response = server
            .post("/api/v1/checkout")
            .json(&json!({
                "items": [{"product_id": "p-1", "price_minor_units": 150_000_00}],
                "payment_method": "card"
            }))
            .await;
        let order_id = response.json::<serde_json::Value>()["order_id"]
            .as_str()
            .unwrap()
            .to_string();

        // No webhook secret configured, so the confirmation is accepted
        // unsigned (disabled-verification mode).
        let webhook = server
            .post("/webhook/epayco")
            .json(&json!({
                "data": {"order_id": order_id, "status": "Aceptada", "ref_payco": "112233"}
            }))
            .await;
        webhook.assert_status_ok();
        assert_eq!(webhook.json::<serde_json::Value>()["ok"], true);

        let order = server.get(&format!("/api/v1/orders/{}", order_id)).await;
        assert_eq!(order.json::<serde_json::Value>()["status"], "paid");

        // Duplicate delivery is acknowledged without changing the order
        let replay = server
            .post("/webhook/epayco")
            .json(&json!({
                "data": {"order_id": order_id, "status": "Aceptada", "ref_payco": "112233"}
            }))
            .await;
        replay.assert_status_ok();

        let order = server.get(&format!("/api/v1/orders/{}", order_id)).await;
        assert_eq!(order.json::<serde_json::Value>()["status"], "paid");
    }

    #[tokio::test]
    async fn test_webhook_for_unknown_order_is_not_found() {
        let server =
            TestServer::new(create_router(test_state(vec![unconfigured_epayco()]))).unwrap();

        let response = server
            .post("/webhook/epayco")
            .json(&json!({
                "data": {"order_id": "no-such-order", "status": "Aceptada"}
            }))
            .await;
        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart() {
        let server = TestServer::new(create_router(test_state(vec![]))).unwrap();

        let response = server
            .post("/api/v1/checkout")
            .json(&json!({
                "items": [],
                "payment_method": "card"
            }))
            .await;
        response.assert_status_bad_request();
    }
}
