//! # caja-core
//!
//! Order/payment orchestration core for the caja storefront.
//!
//! This crate provides:
//! - `Order`, `LineItem`, and the `OrderStatus` state machine
//! - `Money` with integer minor-unit amounts
//! - `OrderStore` trait and the in-memory reference store
//! - `GatewayAdapter` trait implemented by each provider crate
//! - `PaymentOrchestrator` for checkout and `WebhookReconciler` for
//!   idempotent webhook application
//!
//! ## Example
//!
//! ```rust,ignore
//! use caja_core::{
//!     CheckoutRequest, CustomerInfo, LineItem, MemoryOrderStore, Money,
//!     PaymentMethod, PaymentOrchestrator, WebhookReconciler,
//! };
//!
//! let store = Arc::new(MemoryOrderStore::new());
//! let gateways: Vec<BoxedGatewayAdapter> = vec![epayco, mercadopago];
//!
//! let orchestrator = PaymentOrchestrator::new(store.clone(), gateways.clone());
//! let outcome = orchestrator.checkout(request).await?;
//! // Hand outcome.payment_options to the client; an empty list is fine.
//!
//! let reconciler = WebhookReconciler::new(store, gateways);
//! reconciler.apply("epayco", &body, signature).await?;
//! ```

pub mod error;
pub mod gateway;
pub mod money;
pub mod orchestrator;
pub mod order;
pub mod reconciler;
pub mod store;

// Re-exports for convenience
pub use error::{PaymentError, PaymentResult};
pub use gateway::{
    constant_time_eq, hmac_sha256_hex, BoxedGatewayAdapter, GatewayAdapter, GatewaySession,
    WebhookNotice,
};
pub use money::{Currency, Money};
pub use orchestrator::{CheckoutOutcome, CheckoutRequest, PaymentOption, PaymentOrchestrator};
pub use order::{ClaimedOutcome, CustomerInfo, LineItem, Order, OrderStatus, PaymentMethod};
pub use reconciler::{ReconcileOutcome, WebhookReconciler};
pub use store::{MemoryOrderStore, OrderStore};
