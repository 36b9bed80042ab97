//! # ePayco Configuration
//!
//! Credentials come from the environment. Absent keys are NOT an error:
//! the adapter reports `NotConfigured` per call and the orchestrator moves
//! on to the next gateway, which is how local development without ePayco
//! credentials works.

use std::env;

/// Default production API host
pub const DEFAULT_API_BASE_URL: &str = "https://api.secure.payco.co";

/// ePayco API configuration
#[derive(Debug, Clone)]
pub struct EpaycoConfig {
    /// Public key (also sent inside the session payload)
    pub public_key: Option<String>,

    /// Private key; doubles as the webhook HMAC secret
    pub private_key: Option<String>,

    /// API base URL (overridable for testing/mocking)
    pub api_base_url: String,

    /// Where the customer lands after paying
    pub response_url: String,

    /// Our confirmation webhook endpoint
    pub confirmation_url: String,
}

impl EpaycoConfig {
    /// Load from environment variables (`EPAYCO_PUBLIC_KEY`,
    /// `EPAYCO_PRIVATE_KEY`), deriving the callback URLs from the
    /// application base URL.
    pub fn from_env(app_base_url: &str) -> Self {
        dotenvy::dotenv().ok();

        Self {
            public_key: env::var("EPAYCO_PUBLIC_KEY").ok(),
            private_key: env::var("EPAYCO_PRIVATE_KEY").ok(),
            api_base_url: env::var("EPAYCO_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            response_url: format!("{}/checkout/thank-you", app_base_url),
            confirmation_url: format!("{}/webhook/epayco", app_base_url),
        }
    }

    /// Config with explicit credentials (for tests)
    pub fn new(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        app_base_url: &str,
    ) -> Self {
        Self {
            public_key: Some(public_key.into()),
            private_key: Some(private_key.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            response_url: format!("{}/checkout/thank-you", app_base_url),
            confirmation_url: format!("{}/webhook/epayco", app_base_url),
        }
    }

    /// Config with no credentials at all (for tests)
    pub fn unconfigured(app_base_url: &str) -> Self {
        Self {
            public_key: None,
            private_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            response_url: format!("{}/checkout/thank-you", app_base_url),
            confirmation_url: format!("{}/webhook/epayco", app_base_url),
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Both keys present?
    pub fn is_configured(&self) -> bool {
        self.public_key.is_some() && self.private_key.is_some()
    }
}
