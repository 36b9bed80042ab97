//! # Payment Error Types
//!
//! Typed error handling for the caja order/payment core.
//! All checkout and reconciliation operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all order and payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (bad base URL, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed checkout or webhook request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Order lookup failed (unknown id or provider reference)
    #[error("Order not found: {reference}")]
    OrderNotFound { reference: String },

    /// A different provider reference is already attached to the order
    #[error("Order {order_id} already has provider reference {existing}, refusing {attempted}")]
    ReferenceConflict {
        order_id: String,
        existing: String,
        attempted: String,
    },

    /// Compare-and-set guard failed: the order moved under the caller
    #[error("Order {order_id} is {actual}, expected {expected}")]
    StaleTransition {
        order_id: String,
        expected: String,
        actual: String,
    },

    /// Gateway credentials absent from the environment (expected, skip to next)
    #[error("Gateway {gateway} is not configured")]
    NotConfigured { gateway: &'static str },

    /// Payment method outside the gateway's supported set
    #[error("Gateway {gateway} does not support payment method {method}")]
    UnsupportedMethod {
        gateway: &'static str,
        method: String,
    },

    /// Non-2xx provider response
    #[error("Provider error [{gateway}]: {message}")]
    Provider {
        gateway: &'static str,
        message: String,
    },

    /// Network/HTTP error or timeout communicating with a provider
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook signature verification failed
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// Webhook claims a transition the state machine forbids
    #[error("Invalid transition: order is {from}, webhook claims {claimed}")]
    InvalidTransition { from: String, claimed: String },

    /// Webhook or provider payload parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    /// Returns true if the orchestrator should swallow this error and try
    /// the next gateway instead of failing the checkout.
    pub fn is_gateway_skip(&self) -> bool {
        matches!(
            self,
            PaymentError::NotConfigured { .. }
                | PaymentError::UnsupportedMethod { .. }
                | PaymentError::Provider { .. }
                | PaymentError::Network(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::InvalidInput(_) => 400,
            PaymentError::OrderNotFound { .. } => 404,
            PaymentError::ReferenceConflict { .. } => 409,
            PaymentError::StaleTransition { .. } => 409,
            PaymentError::NotConfigured { .. } => 503,
            PaymentError::UnsupportedMethod { .. } => 400,
            PaymentError::Provider { .. } => 502,
            PaymentError::Network(_) => 503,
            PaymentError::InvalidSignature(_) => 401,
            PaymentError::InvalidTransition { .. } => 409,
            PaymentError::Parse(_) => 400,
            PaymentError::Internal(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
