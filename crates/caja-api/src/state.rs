//! # Application State
//!
//! Shared state for the Axum application. Gateway adapters are constructed
//! once here at startup and injected into the orchestrator and reconciler
//! by reference; they are never re-instantiated per request.

use caja_core::{
    BoxedGatewayAdapter, MemoryOrderStore, OrderStore, PaymentOrchestrator, WebhookReconciler,
};
use caja_epayco::{EpaycoConfig, EpaycoGateway};
use caja_mercadopago::{MercadoPagoConfig, MercadoPagoGateway};
use std::sync::Arc;
use tracing::info;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Base URL for provider callbacks
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Checkout orchestration
    pub orchestrator: Arc<PaymentOrchestrator>,
    /// Webhook reconciliation
    pub reconciler: Arc<WebhookReconciler>,
    /// Order store (exposed for order lookup)
    pub store: Arc<dyn OrderStore>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build the production state: env-driven config, in-memory store, and
    /// the fixed-priority gateway list (ePayco before MercadoPago).
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let epayco_config = EpaycoConfig::from_env(&config.base_url);
        let mp_config = MercadoPagoConfig::from_env(&config.base_url);

        info!(
            epayco = epayco_config.is_configured(),
            mercadopago = mp_config.is_configured(),
            "gateway credentials"
        );

        let gateways: Vec<BoxedGatewayAdapter> = vec![
            Arc::new(EpaycoGateway::new(epayco_config)),
            Arc::new(MercadoPagoGateway::new(mp_config)),
        ];

        let store: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());

        Ok(Self::with_parts(store, gateways, config))
    }

    /// Assemble from explicit parts (tests inject their own store/gateways)
    pub fn with_parts(
        store: Arc<dyn OrderStore>,
        gateways: Vec<BoxedGatewayAdapter>,
        config: AppConfig,
    ) -> Self {
        let orchestrator = Arc::new(PaymentOrchestrator::new(store.clone(), gateways.clone()));
        let reconciler = Arc::new(WebhookReconciler::new(store.clone(), gateways));

        Self {
            orchestrator,
            reconciler,
            store,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("BASE_URL");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(!config.is_production());
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }
}
