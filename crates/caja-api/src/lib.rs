//! # caja-api
//!
//! HTTP API layer for caja-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for checkout and order lookup
//! - Webhook handlers for provider payment notifications
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/checkout` | Create order + payment options |
//! | GET | `/api/v1/orders/:id` | Get order |
//! | POST | `/webhook/epayco` | ePayco confirmation |
//! | POST | `/webhook/mercadopago` | MercadoPago notification |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
