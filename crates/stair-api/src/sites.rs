//! Handlers for `/sites` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sites` | Filtered, ordered, paginated markers |
//! | `GET`  | `/sites/{id}` | Full record with images and sources |
//! | `GET`  | `/sites/{id}/popup` | Popup fields for one marker |
//! | `GET`  | `/sites/nearby` | `?lat&lon[&distance][&limit]`, nearest first |
//! | `GET`  | `/sites/in_bbox` | `?minx&miny&maxx&maxy`, paginated |
//! | `GET`  | `/sites/by_era/{id}` | Paginated, popup fields |
//! | `GET`  | `/sites/by_county/{id}` | Paginated, popup fields |
//! | `GET`  | `/sites/statistics` | Catalog aggregates |
//!
//! List endpoints answer an empty collection when the store fails.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use stair_core::{
  pager::{Page, PageProfile, Window},
  planner::{
    ListParams, ProximityParams, SiteQuery, ViewportParams, plan_by_county, plan_by_era, plan_list,
    plan_popup, plan_proximity, plan_viewport,
  },
  site::{SiteDetail, SiteSummary},
  stats::SiteStatistics,
  store::GeoStore,
};

use crate::{
  ApiState,
  error::ApiError,
  features::{
    Feature, FeatureCollection, PagedFeatureCollection, SiteDetailProperties, SiteFeature,
    site_detail_feature,
  },
  or_empty,
  paging::{PageParams, RequestUrl},
};

type PagedSites = PagedFeatureCollection<SiteFeature>;

/// Count, validate the page, then fetch exactly that page.
async fn fetch_page<S: GeoStore>(
  store: &S,
  query: SiteQuery,
  page: &PageParams,
  profile: &PageProfile,
) -> Result<Page<SiteSummary>, ApiError> {
  let size = page.size(profile);
  let count = store.count_sites(query.clone()).await.map_err(ApiError::store)?;
  let number = page.number(count, size)?;
  let results = store
    .search_sites(query.with_window(Window::page(number, size)))
    .await
    .map_err(ApiError::store)?;
  Ok(Page::new(count, number, size, results))
}

async fn paged_sites<S: GeoStore>(
  state: &ApiState<S>,
  operation: &'static str,
  query: SiteQuery,
  page: &PageParams,
  url: &RequestUrl,
) -> Result<Json<PagedSites>, ApiError> {
  let fetched = fetch_page(&*state.store, query.clone(), page, &state.config.map_pages)
    .await
    .map(|p| PagedFeatureCollection::new(p.map(SiteFeature::from), url));
  let collection = or_empty(operation, &query, fetched, PagedFeatureCollection::empty)?;
  Ok(Json(collection))
}

// ─── Lists ───────────────────────────────────────────────────────────────────

/// `GET /sites`
pub async fn list<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
  Query(page): Query<PageParams>,
  url: RequestUrl,
) -> Result<Json<PagedSites>, ApiError> {
  let query = plan_list(&params)?;
  paged_sites(&state, "list_sites", query, &page, &url).await
}

/// `GET /sites/in_bbox?minx&miny&maxx&maxy`
pub async fn in_bbox<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ViewportParams>,
  Query(page): Query<PageParams>,
  url: RequestUrl,
) -> Result<Json<PagedSites>, ApiError> {
  let query = plan_viewport(&params)?;
  paged_sites(&state, "sites_in_bbox", query, &page, &url).await
}

/// `GET /sites/by_era/{id}`
pub async fn by_era<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Query(page): Query<PageParams>,
  url: RequestUrl,
) -> Result<Json<PagedSites>, ApiError> {
  paged_sites(&state, "sites_by_era", plan_by_era(id), &page, &url).await
}

/// `GET /sites/by_county/{id}`
pub async fn by_county<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
  Query(page): Query<PageParams>,
  url: RequestUrl,
) -> Result<Json<PagedSites>, ApiError> {
  paged_sites(&state, "sites_by_county", plan_by_county(id), &page, &url).await
}

/// `GET /sites/nearby?lat&lon[&distance][&limit]`
///
/// Not paginated: `limit` bounds the result.
pub async fn nearby<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ProximityParams>,
) -> Result<Json<FeatureCollection<SiteFeature>>, ApiError> {
  let query = plan_proximity(&params)?;
  let found = state
    .store
    .search_sites(query)
    .await
    .map_err(ApiError::store)
    .map(|sites| FeatureCollection::new(sites.into_iter().map(SiteFeature::from).collect()));
  let collection = or_empty("sites_nearby", &params, found, || FeatureCollection::new(Vec::new()))?;
  Ok(Json(collection))
}

// ─── Single site ─────────────────────────────────────────────────────────────

fn site_not_found(id: i64) -> ApiError {
  stair_core::Error::not_found(format!("site {id} not found")).into()
}

/// `GET /sites/{id}`
pub async fn get_one<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Feature<geojson::Geometry, SiteDetailProperties>>, ApiError> {
  let detail: SiteDetail = state
    .store
    .get_site(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| site_not_found(id))?;
  Ok(Json(site_detail_feature(detail)))
}

/// `GET /sites/{id}/popup`
pub async fn popup<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<SiteFeature>, ApiError> {
  let site = state
    .store
    .search_sites(plan_popup(id))
    .await
    .map_err(ApiError::store)?
    .into_iter()
    .next()
    .ok_or_else(|| site_not_found(id))?;
  Ok(Json(SiteFeature::from(site)))
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// `GET /sites/statistics`
pub async fn statistics<S: GeoStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<SiteStatistics>, ApiError> {
  let stats = state.store.site_statistics().await.map_err(ApiError::store)?;
  Ok(Json(stats))
}
