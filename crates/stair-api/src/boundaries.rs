//! Handlers for `/provinces` and `/counties`.
//!
//! The layer endpoints forward the FeatureCollection text built by the store
//! without parsing it. A failed build degrades to an empty collection.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use serde::Deserialize;
use stair_core::{
  boundary::{
    BoundaryDetail, BoundaryLayer, BoundaryQuery, CountySummary, EMPTY_FEATURE_COLLECTION,
    ProvinceSummary,
  },
  pager::Window,
  store::GeoStore,
};

use crate::{
  ApiState,
  error::ApiError,
  features::{BoundaryFeature, boundary_feature},
  or_empty,
};

/// `?province=` on the county endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct CountyParams {
  pub province: Option<String>,
}

impl CountyParams {
  fn province(&self) -> Result<Option<i64>, ApiError> {
    match self.province.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      None => Ok(None),
      Some(s) => s.parse::<i64>().map(Some).map_err(|_| {
        stair_core::Error::validation("province: A valid integer is required.").into()
      }),
    }
  }
}

fn geojson_response(body: String) -> Response {
  ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn layer<S: GeoStore>(
  state: &ApiState<S>,
  operation: &'static str,
  query: BoundaryQuery,
) -> Result<Response, ApiError> {
  let built = state.store.materialize_boundaries(query.clone()).await.map_err(ApiError::store);
  let body = or_empty(operation, &query, built, || EMPTY_FEATURE_COLLECTION.to_owned())?;
  Ok(geojson_response(body))
}

// ─── Layers ──────────────────────────────────────────────────────────────────

/// `GET /provinces`
pub async fn provinces<S: GeoStore>(State(state): State<ApiState<S>>) -> Result<Response, ApiError> {
  let cfg = &state.config;
  let query = BoundaryQuery::provinces(cfg.province_tolerance, cfg.boundary_description_chars);
  layer(&state, "materialize_provinces", query).await
}

/// `GET /counties[?province=]`
pub async fn counties<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<CountyParams>,
) -> Result<Response, ApiError> {
  let cfg = &state.config;
  let query = BoundaryQuery::counties(
    params.province()?,
    cfg.county_tolerance,
    cfg.boundary_description_chars,
  );
  layer(&state, "materialize_counties", query).await
}

/// `GET /counties/by_province/{id}`
pub async fn counties_by_province<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Response, ApiError> {
  let cfg = &state.config;
  let query = BoundaryQuery::counties(Some(id), cfg.county_tolerance, cfg.boundary_description_chars);
  layer(&state, "materialize_counties", query).await
}

// ─── Simple listings ─────────────────────────────────────────────────────────

/// `GET /provinces/list_simple`
pub async fn provinces_simple<S: GeoStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<ProvinceSummary>>, ApiError> {
  let window = Window::first(state.config.fallback_cap);
  let rows = state.store.list_provinces(window).await.map_err(ApiError::store);
  Ok(Json(or_empty("list_provinces", &window, rows, Vec::new)?))
}

/// `GET /counties/list_simple[?province=]`
pub async fn counties_simple<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<CountyParams>,
) -> Result<Json<Vec<CountySummary>>, ApiError> {
  let province = params.province()?;
  let window = Window::first(state.config.fallback_cap);
  let rows = state.store.list_counties(province, window).await.map_err(ApiError::store);
  Ok(Json(or_empty("list_counties", &(province, window), rows, Vec::new)?))
}

// ─── Detail ──────────────────────────────────────────────────────────────────

async fn detail<S: GeoStore>(
  state: &ApiState<S>,
  layer: BoundaryLayer,
  id: i64,
) -> Result<BoundaryDetail, ApiError> {
  state
    .store
    .get_boundary(layer, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| stair_core::Error::not_found(format!("{} {id} not found", layer.as_str())).into())
}

/// `GET /provinces/{id}`
pub async fn province<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<BoundaryFeature>, ApiError> {
  let d = detail(&state, BoundaryLayer::Province, id).await?;
  Ok(Json(boundary_feature(d)))
}

/// `GET /counties/{id}`
pub async fn county<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<BoundaryFeature>, ApiError> {
  let d = detail(&state, BoundaryLayer::County, id).await?;
  Ok(Json(boundary_feature(d)))
}
