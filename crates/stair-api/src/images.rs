//! Handlers for `/images`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/images` | `?site&is_primary`, paginated |
//! | `GET`  | `/images/by_site/{site_id}` | Every image of one site, capped |
//! | `GET`  | `/images/{id}` | Single image |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use stair_core::{
  pager::{Page, PageProfile, Window},
  site::SiteImage,
  store::{GeoStore, ImageQuery},
};

use crate::{
  ApiState,
  error::ApiError,
  or_empty,
  paging::{PageParams, Paginated, RequestUrl},
};

#[derive(Debug, Default, Deserialize)]
pub struct ImageParams {
  pub site:       Option<String>,
  pub is_primary: Option<String>,
}

impl ImageParams {
  fn query(&self) -> Result<ImageQuery, ApiError> {
    let site_id = match self.site.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      None => None,
      Some(s) => Some(s.parse::<i64>().map_err(|_| {
        stair_core::Error::validation("site: A valid integer is required.")
      })?),
    };
    let is_primary = match self.is_primary.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
      None | Some("") => None,
      Some("true" | "1") => Some(true),
      Some("false" | "0") => Some(false),
      Some(_) => return Err(stair_core::Error::validation("is_primary: Must be a valid boolean.").into()),
    };
    Ok(ImageQuery { site_id, is_primary, window: Window::default() })
  }
}

async fn fetch_page<S: GeoStore>(
  store: &S,
  query: ImageQuery,
  page: &PageParams,
  profile: &PageProfile,
) -> Result<Page<SiteImage>, ApiError> {
  let size = page.size(profile);
  let count = store.count_images(query.clone()).await.map_err(ApiError::store)?;
  let number = page.number(count, size)?;
  let results = store
    .list_images(ImageQuery { window: Window::page(number, size), ..query })
    .await
    .map_err(ApiError::store)?;
  Ok(Page::new(count, number, size, results))
}

/// `GET /images[?site][&is_primary][&page][&page_size]`
pub async fn list<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ImageParams>,
  Query(page): Query<PageParams>,
  url: RequestUrl,
) -> Result<Json<Paginated<SiteImage>>, ApiError> {
  let query = params.query()?;
  let fetched = fetch_page(&*state.store, query.clone(), &page, &state.config.standard_pages)
    .await
    .map(|p| Paginated::new(p, &url));
  Ok(Json(or_empty("list_images", &query, fetched, Paginated::empty)?))
}

/// `GET /images/by_site/{site_id}`
pub async fn by_site<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(site_id): Path<i64>,
) -> Result<Json<Vec<SiteImage>>, ApiError> {
  let query = ImageQuery {
    site_id:    Some(site_id),
    is_primary: None,
    window:     Window::first(state.config.fallback_cap),
  };
  let images = state.store.list_images(query.clone()).await.map_err(ApiError::store);
  Ok(Json(or_empty("images_by_site", &query, images, Vec::new)?))
}

/// `GET /images/{id}`
pub async fn get_one<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<SiteImage>, ApiError> {
  let image = state
    .store
    .get_image(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::from(stair_core::Error::not_found(format!("image {id} not found"))))?;
  Ok(Json(image))
}
