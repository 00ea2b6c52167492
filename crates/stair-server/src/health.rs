//! Liveness and database health checks.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use stair_core::store::GeoStore;

/// `GET /health`
pub async fn service() -> Json<Value> {
  Json(json!({ "status": "healthy", "service": env!("CARGO_PKG_NAME") }))
}

/// `GET /health/db`: 200 if the store answers a trivial query, 500 otherwise.
pub async fn database<S: GeoStore>(State(store): State<Arc<S>>) -> (StatusCode, Json<Value>) {
  match store.ping().await {
    Ok(()) => (StatusCode::OK, Json(json!({ "database": "connected", "status": "healthy" }))),
    Err(e) => {
      tracing::error!(error = %e, "database health check failed");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "database": "error", "message": e.to_string() })),
      )
    }
  }
}
