//! # Caja RS
//!
//! Order and payment orchestration service.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export EPAYCO_PUBLIC_KEY=...
//! export EPAYCO_PRIVATE_KEY=...
//! export MP_ACCESS_TOKEN=...
//!
//! # Run the server
//! caja
//! ```

use caja_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Gateway priority: {:?}", state.orchestrator.gateway_ids());

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Caja starting on http://{}", addr);

    if !is_prod {
        info!("Checkout: POST http://{}/api/v1/checkout", addr);
        info!("Webhooks: POST http://{}/webhook/{{epayco,mercadopago}}", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
