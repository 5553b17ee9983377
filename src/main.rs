//! ESL Lesson Presenter · Backend
//!
//! - Axum HTTP + WebSocket API
//! - Server-side presentation sessions (reveal, navigation, interactive activities)
//! - Optional OpenAI integration for lessons, slide images and reviews
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables OpenAI integration if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_TEXT_MODEL   : default "gpt-4o-mini"
//!   OPENAI_VISION_MODEL : default "gpt-4o"
//!   OPENAI_IMAGE_MODEL  : default "gpt-image-1"
//!   LESSON_CONFIG_PATH  : path to TOML config (prompts, presentation, viewer defaults)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod activity;
mod reveal;
mod navigator;
mod session;
mod imaging;
mod store;
mod seeds;
mod state;
mod protocol;
mod logic;
mod openai;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (store, OpenAI client, prompts, presentation timing).
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "esl_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "esl_backend", "Shutdown signal received");
    })
    .await?;
  Ok(())
}
