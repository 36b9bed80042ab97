//! # MercadoPago Configuration
//!
//! `MP_ACCESS_TOKEN` authorizes preference creation; `MP_WEBHOOK_SECRET`
//! (optional) enables notification signature verification. A missing access
//! token makes the adapter report `NotConfigured` per call.

use std::env;

/// Default production API host
pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadopago.com";

/// MercadoPago API configuration
#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    /// Access token for the preferences API
    pub access_token: Option<String>,

    /// Shared secret for notification signatures
    pub webhook_secret: Option<String>,

    /// API base URL (overridable for testing/mocking)
    pub api_base_url: String,

    /// Where the customer lands after paying (success/failure/pending alike)
    pub back_url: String,

    /// Our notification webhook endpoint
    pub notification_url: String,
}

impl MercadoPagoConfig {
    /// Load from environment variables, deriving callback URLs from the
    /// application base URL.
    pub fn from_env(app_base_url: &str) -> Self {
        dotenvy::dotenv().ok();

        Self {
            access_token: env::var("MP_ACCESS_TOKEN").ok(),
            webhook_secret: env::var("MP_WEBHOOK_SECRET").ok(),
            api_base_url: env::var("MP_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            back_url: format!("{}/checkout/thank-you", app_base_url),
            notification_url: format!("{}/webhook/mercadopago", app_base_url),
        }
    }

    /// Config with explicit credentials (for tests)
    pub fn new(
        access_token: impl Into<String>,
        webhook_secret: impl Into<String>,
        app_base_url: &str,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            webhook_secret: Some(webhook_secret.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            back_url: format!("{}/checkout/thank-you", app_base_url),
            notification_url: format!("{}/webhook/mercadopago", app_base_url),
        }
    }

    /// Config with no credentials at all (for tests)
    pub fn unconfigured(app_base_url: &str) -> Self {
        Self {
            access_token: None,
            webhook_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            back_url: format!("{}/checkout/thank-you", app_base_url),
            notification_url: format!("{}/webhook/mercadopago", app_base_url),
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.access_token.is_some()
    }
}
