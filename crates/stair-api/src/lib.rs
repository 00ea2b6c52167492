//! JSON and GeoJSON REST API for Stair.
//!
//! Exposes an axum [`Router`] backed by any [`stair_core::store::GeoStore`].
//! TLS, static files and health checks are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1", stair_api::api_router(state))
//! ```

pub mod boundaries;
pub mod bucket;
pub mod eras;
pub mod error;
pub mod features;
pub mod images;
pub mod paging;
pub mod photos;
pub mod session;
pub mod sites;

use std::{fmt::Debug, sync::Arc};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use serde::Deserialize;
use stair_core::{
  pager::{FALLBACK_CAP, PageProfile},
  store::GeoStore,
};

pub use error::ApiError;
use photos::PhotoStore;
use session::SessionCookie;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Tunables for the API layer. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Images and bucket lists.
  pub standard_pages:             PageProfile,
  /// Site lists and map searches.
  pub map_pages:                  PageProfile,
  /// Truncation applied to unpaginated lists.
  pub fallback_cap:               usize,
  /// Simplification tolerance for province outlines, in degrees.
  pub province_tolerance:         f64,
  pub county_tolerance:           f64,
  pub boundary_description_chars: usize,
  pub max_photo_bytes:            usize,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      standard_pages:             PageProfile::STANDARD,
      map_pages:                  PageProfile::MAP,
      fallback_cap:               FALLBACK_CAP,
      province_tolerance:         0.005,
      county_tolerance:           0.003,
      boundary_description_chars: 500,
      max_photo_bytes:            5 * 1024 * 1024,
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:   Arc<S>,
  pub config:  Arc<ApiConfig>,
  pub photos:  Arc<PhotoStore>,
  pub session: Arc<SessionCookie>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:   self.store.clone(),
      config:  self.config.clone(),
      photos:  self.photos.clone(),
      session: self.session.clone(),
    }
  }
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>, config: ApiConfig, photos: PhotoStore, session: SessionCookie) -> Self {
    Self {
      store,
      config: Arc::new(config),
      photos: Arc::new(photos),
      session: Arc::new(session),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: GeoStore + 'static,
{
  let bucket_list = Router::new()
    .route("/bucket-list", get(bucket::list::<S>).post(bucket::create::<S>))
    .route("/bucket-list/statistics", get(bucket::statistics::<S>))
    .route(
      "/bucket-list/{id}",
      get(bucket::get_one::<S>).patch(bucket::update::<S>).delete(bucket::remove::<S>),
    )
    .route("/bucket-list/{id}/mark_visited", post(bucket::mark_visited::<S>))
    .route("/bucket-list/{id}/toggle_status", post(bucket::toggle_status::<S>))
    .layer(middleware::from_fn_with_state(state.clone(), session::session_layer::<S>));

  Router::new()
    // Sites
    .route("/sites", get(sites::list::<S>))
    .route("/sites/nearby", get(sites::nearby::<S>))
    .route("/sites/in_bbox", get(sites::in_bbox::<S>))
    .route("/sites/statistics", get(sites::statistics::<S>))
    .route("/sites/by_era/{id}", get(sites::by_era::<S>))
    .route("/sites/by_county/{id}", get(sites::by_county::<S>))
    .route("/sites/{id}", get(sites::get_one::<S>))
    .route("/sites/{id}/popup", get(sites::popup::<S>))
    // Boundaries
    .route("/provinces", get(boundaries::provinces::<S>))
    .route("/provinces/list_simple", get(boundaries::provinces_simple::<S>))
    .route("/provinces/{id}", get(boundaries::province::<S>))
    .route("/counties", get(boundaries::counties::<S>))
    .route("/counties/list_simple", get(boundaries::counties_simple::<S>))
    .route("/counties/by_province/{id}", get(boundaries::counties_by_province::<S>))
    .route("/counties/{id}", get(boundaries::county::<S>))
    // Eras
    .route("/eras", get(eras::list::<S>))
    .route("/eras/timeline", get(eras::timeline::<S>))
    .route("/eras/{id}", get(eras::get_one::<S>))
    // Images
    .route("/images", get(images::list::<S>))
    .route("/images/by_site/{site_id}", get(images::by_site::<S>))
    .route("/images/{id}", get(images::get_one::<S>))
    .merge(bucket_list)
    .with_state(state)
}

// ─── Degraded reads ──────────────────────────────────────────────────────────

/// Replace an upstream failure on a public read with an empty response.
///
/// Request errors (validation, missing records, bad pages) pass through.
pub(crate) fn or_empty<T>(
  operation: &'static str,
  input: &dyn Debug,
  result: Result<T, ApiError>,
  empty: impl FnOnce() -> T,
) -> Result<T, ApiError> {
  match result {
    Err(e) if e.is_upstream() => {
      tracing::warn!(operation, ?input, error = %e, "serving empty result");
      Ok(empty())
    }
    other => other,
  }
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests;
