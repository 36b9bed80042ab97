//! # caja-epayco
//!
//! ePayco gateway adapter for caja-rs.
//!
//! ePayco is the card / PSE bank transfer / Efecty cash-voucher processor.
//! The adapter translates an internal order into an ePayco checkout session
//! and an ePayco confirmation webhook into a normalized notice; it persists
//! nothing itself.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use caja_epayco::{EpaycoConfig, EpaycoGateway};
//! use caja_core::GatewayAdapter;
//!
//! let gateway = EpaycoGateway::new(EpaycoConfig::from_env("https://tienda.example"));
//! let session = gateway.create_session(&order, method, &customer).await?;
//! // Redirect the customer to session.redirect_url
//! ```

pub mod config;
pub mod session;
pub mod webhook;

// Re-exports
pub use config::EpaycoConfig;
pub use session::{EpaycoGateway, GATEWAY_ID, GATEWAY_LABEL};
