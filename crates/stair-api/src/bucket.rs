//! Handlers for `/bucket-list` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/bucket-list` | `?status&ordering`, paginated |
//! | `POST`   | `/bucket-list` | Body: [`CreateBody`]; 201, or 400 with `item_id` on duplicate |
//! | `GET`    | `/bucket-list/{id}` | |
//! | `PATCH`  | `/bucket-list/{id}` | Body: [`UpdateBody`] |
//! | `DELETE` | `/bucket-list/{id}` | 204 |
//! | `POST`   | `/bucket-list/{id}/mark_visited` | Optional body: [`MarkVisitedBody`] |
//! | `POST`   | `/bucket-list/{id}/toggle_status` | |
//! | `GET`    | `/bucket-list/statistics` | |
//!
//! Every handler is scoped to the caller's [`Session`]. Items of other
//! sessions are indistinguishable from missing ones.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use stair_core::{
  bucket::{
    BucketAction, BucketListItem, BucketPatch, BucketQuery, BucketStatistics, BucketStatus,
    NewBucketItem, PhotoRef, parse_bucket_ordering,
  },
  pager::{Page, Window},
  session::SessionContext,
  store::GeoStore,
};

use crate::{
  ApiState,
  error::ApiError,
  paging::{PageParams, Paginated, RequestUrl},
  photos::{PhotoStore, PhotoUpload, SavedPhoto},
  session::Session,
};

// ─── Bodies ──────────────────────────────────────────────────────────────────

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
  serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Like [`parse_body`], but an empty body yields the default.
fn parse_optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
  if body.iter().all(u8::is_ascii_whitespace) { Ok(T::default()) } else { parse_body(body) }
}

fn parse_status(raw: Option<&str>) -> Result<Option<BucketStatus>, ApiError> {
  Ok(raw.map(str::parse::<BucketStatus>).transpose()?)
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub site_id: i64,
  /// Defaults to `wishlist`.
  pub status:  Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub status:        Option<String>,
  pub photo:         Option<PhotoUpload>,
  pub photo_caption: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkVisitedBody {
  pub photo:         Option<PhotoUpload>,
  pub photo_caption: Option<String>,
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// An item as returned to the client, with its photo resolved to a URL.
#[derive(Debug, Serialize)]
pub struct BucketItemView {
  #[serde(flatten)]
  pub item:      BucketListItem,
  pub photo_url: Option<String>,
}

impl BucketItemView {
  fn new(item: BucketListItem, photos: &PhotoStore) -> Self {
    let photo_url = item.photo.as_ref().map(|p| photos.url(p));
    Self { item, photo_url }
  }
}

fn item_not_found(id: i64) -> ApiError {
  stair_core::Error::not_found(format!("bucket list item {id} not found")).into()
}

// ─── Collection ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status:   Option<String>,
  pub ordering: Option<String>,
}

/// `GET /bucket-list[?status][&ordering][&page][&page_size]`
pub async fn list<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Session(session): Session,
  Query(params): Query<ListParams>,
  Query(page): Query<PageParams>,
  url: RequestUrl,
) -> Result<Json<Paginated<BucketItemView>>, ApiError> {
  let query = BucketQuery {
    status: parse_status(params.status.as_deref())?,
    order:  parse_bucket_ordering(params.ordering.as_deref())?,
    window: Window::default(),
  };
  let size = page.size(&state.config.standard_pages);
  let count = state
    .store
    .count_bucket_items(session.clone(), query.clone())
    .await
    .map_err(ApiError::store)?;
  let number = page.number(count, size)?;
  let items = state
    .store
    .list_bucket_items(session, BucketQuery { window: Window::page(number, size), ..query })
    .await
    .map_err(ApiError::store)?;

  let page = Page::new(count, number, size, items).map(|i| BucketItemView::new(i, &state.photos));
  Ok(Json(Paginated::new(page, &url)))
}

/// `POST /bucket-list`
pub async fn create<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Session(session): Session,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
  let body: CreateBody = parse_body(&body)?;
  let input = NewBucketItem {
    site_id: body.site_id,
    status:  parse_status(body.status.as_deref())?.unwrap_or_default(),
  };

  let item = state
    .store
    .add_bucket_item(session.clone(), input)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    session = session.log_prefix(),
    site_id = input.site_id,
    item_id = item.id,
    status = item.status.as_str(),
    "added bucket list item"
  );
  Ok((StatusCode::CREATED, Json(BucketItemView::new(item, &state.photos))))
}

/// `GET /bucket-list/statistics`
pub async fn statistics<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Session(session): Session,
) -> Result<Json<BucketStatistics>, ApiError> {
  Ok(Json(state.store.bucket_statistics(session).await.map_err(ApiError::store)?))
}

// ─── Single item ─────────────────────────────────────────────────────────────

/// `GET /bucket-list/{id}`
pub async fn get_one<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Session(session): Session,
  Path(id): Path<i64>,
) -> Result<Json<BucketItemView>, ApiError> {
  let item = state
    .store
    .get_bucket_item(session, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| item_not_found(id))?;
  Ok(Json(BucketItemView::new(item, &state.photos)))
}

/// Store an attached photo for item `id`. The item must exist in this
/// session before anything is written.
async fn save_photo<S: GeoStore>(
  state: &ApiState<S>,
  session: &SessionContext,
  id: i64,
  upload: Option<&PhotoUpload>,
) -> Result<Option<SavedPhoto>, ApiError> {
  let Some(upload) = upload else {
    return Ok(None);
  };
  // Reject bad payloads before touching the store.
  state.photos.decode(upload)?;
  if state.store.get_bucket_item(session.clone(), id).await.map_err(ApiError::store)?.is_none() {
    return Err(item_not_found(id));
  }
  Ok(Some(state.photos.save(upload).await?))
}

/// Save the upload, then apply the action built around it. A photo written
/// for an update that fails is removed again.
async fn apply_with_photo<S: GeoStore>(
  state: &ApiState<S>,
  session: SessionContext,
  id: i64,
  upload: Option<&PhotoUpload>,
  action: impl FnOnce(Option<PhotoRef>) -> BucketAction,
) -> Result<Json<BucketItemView>, ApiError> {
  let saved = save_photo(state, &session, id, upload).await?;
  let result = apply(state, session, id, action(saved.as_ref().map(|s| s.photo.clone()))).await;
  if result.is_err()
    && let Some(saved) = &saved
  {
    state.photos.discard(saved).await;
  }
  result
}

async fn apply<S: GeoStore>(
  state: &ApiState<S>,
  session: SessionContext,
  id: i64,
  action: BucketAction,
) -> Result<Json<BucketItemView>, ApiError> {
  let prefix = session.log_prefix().to_owned();
  let item = state
    .store
    .apply_bucket_action(session, id, action)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| item_not_found(id))?;
  tracing::debug!(session = %prefix, item_id = id, status = item.status.as_str(), "updated bucket list item");
  Ok(Json(BucketItemView::new(item, &state.photos)))
}

/// `PATCH /bucket-list/{id}`
pub async fn update<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Session(session): Session,
  Path(id): Path<i64>,
  body: Bytes,
) -> Result<Json<BucketItemView>, ApiError> {
  let body: UpdateBody = parse_optional_body(&body)?;
  let status = parse_status(body.status.as_deref())?;

  apply_with_photo(&state, session, id, body.photo.as_ref(), |photo| {
    BucketAction::Update(BucketPatch { status, photo, photo_caption: body.photo_caption })
  })
  .await
}

/// `POST /bucket-list/{id}/mark_visited`
pub async fn mark_visited<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Session(session): Session,
  Path(id): Path<i64>,
  body: Bytes,
) -> Result<Json<BucketItemView>, ApiError> {
  let body: MarkVisitedBody = parse_optional_body(&body)?;
  apply_with_photo(&state, session, id, body.photo.as_ref(), |photo| {
    BucketAction::MarkVisited { photo, photo_caption: body.photo_caption }
  })
  .await
}

/// `POST /bucket-list/{id}/toggle_status`
pub async fn toggle_status<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Session(session): Session,
  Path(id): Path<i64>,
) -> Result<Json<BucketItemView>, ApiError> {
  apply(&state, session, id, BucketAction::ToggleStatus).await
}

/// `DELETE /bucket-list/{id}`
pub async fn remove<S: GeoStore>(
  State(state): State<ApiState<S>>,
  Session(session): Session,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  let prefix = session.log_prefix().to_owned();
  if state.store.remove_bucket_item(session, id).await.map_err(ApiError::store)? {
    tracing::info!(session = %prefix, item_id = id, "removed bucket list item");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(item_not_found(id))
  }
}
