//! Handlers for `/eras`.

use axum::{
  Json,
  extract::{Path, State},
};
use stair_core::{
  era::{Era, TimelineEntry},
  pager::Window,
  store::GeoStore,
};

use crate::{ApiState, error::ApiError, or_empty};

/// `GET /eras`, chronological.
pub async fn list<S: GeoStore>(State(state): State<ApiState<S>>) -> Result<Json<Vec<Era>>, ApiError> {
  let window = Window::first(state.config.fallback_cap);
  let eras = state.store.list_eras(window).await.map_err(ApiError::store);
  Ok(Json(or_empty("list_eras", &window, eras, Vec::new)?))
}

/// `GET /eras/{id}`
pub async fn get_one<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Era>, ApiError> {
  let era = state
    .store
    .get_era(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::from(stair_core::Error::not_found(format!("era {id} not found"))))?;
  Ok(Json(era))
}

/// `GET /eras/timeline`, with per-era site counts and durations.
pub async fn timeline<S: GeoStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
  let window = Window::first(state.config.fallback_cap);
  let entries = state.store.era_timeline(window).await.map_err(ApiError::store);
  Ok(Json(or_empty("era_timeline", &window, entries, Vec::new)?))
}
