//! Studykit · study companion backend
//!
//! - Axum HTTP + WebSocket API
//! - Anthropic or OpenAI generation (via environment variables), mock otherwise
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   ANTHROPIC_API_KEY     : primary provider if present
//!   ANTHROPIC_BASE_URL    : default "https://api.anthropic.com"
//!   ANTHROPIC_MODEL       : default "claude-3-5-sonnet-20241022"
//!   OPENAI_API_KEY        : secondary provider if present
//!   OPENAI_BASE_URL       : default "https://api.openai.com/v1"
//!   OPENAI_MODEL          : default "gpt-4o"
//!   PROVIDER_TIMEOUT_SECS : request timeout for provider calls (unset = none)
//!   STUDYKIT_CONFIG_PATH  : path to TOML config (prompts, exam policy, materials)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use studykit_backend::{build_router, telemetry, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = AppConfig::from_env();
  let state = Arc::new(AppState::new(config)?);
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "studykit_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
