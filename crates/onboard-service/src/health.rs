//! Health check endpoint.

use std::sync::Arc;

use anyhow::Context as _;
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use chrono::{DateTime, Utc};
use onboard_core::processor::OutcomeCounts;
use serde::Serialize;
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
  pub status:      &'static str,
  pub started_at:  DateTime<Utc>,
  pub uptime_secs: i64,
  pub messages:    OutcomeCounts,
}

#[derive(Clone)]
pub struct AppState {
  pub started_at: DateTime<Utc>,
  pub counts:     Arc<RwLock<OutcomeCounts>>,
}

impl AppState {
  pub fn new(counts: Arc<RwLock<OutcomeCounts>>) -> Self {
    Self { started_at: Utc::now(), counts }
  }
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
  let uptime = Utc::now().signed_duration_since(state.started_at);
  Json(HealthStatus {
    status:      "ok",
    started_at:  state.started_at,
    uptime_secs: uptime.num_seconds().max(0),
    messages:    *state.counts.read().await,
  })
}

async fn live() -> StatusCode { StatusCode::OK }

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/live", get(live))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
  let address = format!("0.0.0.0:{port}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!("health server listening on http://{address}");
  axum::serve(listener, router(state))
    .await
    .context("health server error")
}
