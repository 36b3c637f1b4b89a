//! Peeky · Question Service Backend
//!
//! - Axum HTTP + WebSocket API for the kids' quiz game
//! - Question supply: Gemini generation, optional cache, bundled local bank
//! - Server-side generation function (`/functions/v1/generate-questions`)
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   GEMINI_API_KEY     : enables generation if present
//!   GEMINI_BASE_URL    : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL       : default "gemini-2.5-flash"
//!   SUPABASE_URL       : backend project URL (edge function transport / supabase cache)
//!   SUPABASE_KEY       : backend key (SUPABASE_ANON_KEY also accepted)
//!   PEEKY_CONFIG_PATH  : path to TOML config (transport, cache, local dataset, limits)
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod profiles;
mod prompt;
mod generator;
mod gemini;
mod cache;
mod supabase;
mod local;
mod pipeline;
mod state;
mod protocol;
mod routes;
#[cfg(test)]
mod test_http;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (pipeline, generator transport, cache, local bank).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "peeky_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "peeky_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "peeky_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "peeky_backend", "Shutdown signal received");
}
