//! # caja-mercadopago
//!
//! MercadoPago gateway adapter for caja-rs.
//!
//! MercadoPago is the alternate wallet processor. The adapter creates a
//! checkout preference (redirect via `init_point`) and normalizes payment
//! notifications; it persists nothing itself.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use caja_mercadopago::{MercadoPagoConfig, MercadoPagoGateway};
//! use caja_core::GatewayAdapter;
//!
//! let gateway =
//!     MercadoPagoGateway::new(MercadoPagoConfig::from_env("https://tienda.example"));
//! let session = gateway.create_session(&order, method, &customer).await?;
//! ```

pub mod config;
pub mod preference;
pub mod webhook;

// Re-exports
pub use config::MercadoPagoConfig;
pub use preference::{MercadoPagoGateway, GATEWAY_ID, GATEWAY_LABEL};
