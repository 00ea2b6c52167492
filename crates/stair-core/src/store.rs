//! The `GeoStore` trait: the engine's view of the geometry store.
//!
//! The trait is implemented by storage backends (e.g. `stair-store-sqlite`).
//! Higher layers (`stair-api`, `stair-server`) depend on this abstraction,
//! not on any concrete backend.
//!
//! Every spatial predicate, simplification step and aggregate named here runs
//! inside the store. Implementations must apply the site visibility rule
//! (approved, not deleted) to every site read, and must scope every
//! bucket-list call to the [`SessionContext`] it is given.

use std::future::Future;

use crate::{
  boundary::{BoundaryDetail, BoundaryLayer, BoundaryQuery, CountySummary, ProvinceSummary},
  bucket::{BucketAction, BucketListItem, BucketQuery, BucketStatistics, NewBucketItem},
  era::{Era, TimelineEntry},
  pager::Window,
  planner::SiteQuery,
  session::SessionContext,
  site::{SiteDetail, SiteImage, SiteSummary},
  stats::SiteStatistics,
};

/// Parameters for [`GeoStore::list_images`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageQuery {
  pub site_id:    Option<i64>,
  pub is_primary: Option<bool>,
  pub window:     Window,
}

/// Abstraction over a geometry store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait GeoStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Sites ─────────────────────────────────────────────────────────────

  /// Execute a planned query, honouring its window, ordering and projection.
  fn search_sites(
    &self,
    query: SiteQuery,
  ) -> impl Future<Output = Result<Vec<SiteSummary>, Self::Error>> + Send + '_;

  /// Count the rows `query` would match, ignoring its window.
  fn count_sites(
    &self,
    query: SiteQuery,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Full record with images and sources. `None` if not visible.
  fn get_site(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<SiteDetail>, Self::Error>> + Send + '_;

  fn site_statistics(
    &self,
  ) -> impl Future<Output = Result<SiteStatistics, Self::Error>> + Send + '_;

  // ── Boundaries ────────────────────────────────────────────────────────

  /// Build the layer's simplified FeatureCollection inside the store and
  /// return it as JSON text.
  fn materialize_boundaries(
    &self,
    query: BoundaryQuery,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  fn get_boundary(
    &self,
    layer: BoundaryLayer,
    id: i64,
  ) -> impl Future<Output = Result<Option<BoundaryDetail>, Self::Error>> + Send + '_;

  /// Geometry-free province rows by name, limited to `window`.
  fn list_provinces(
    &self,
    window: Window,
  ) -> impl Future<Output = Result<Vec<ProvinceSummary>, Self::Error>> + Send + '_;

  fn list_counties(
    &self,
    province: Option<i64>,
    window: Window,
  ) -> impl Future<Output = Result<Vec<CountySummary>, Self::Error>> + Send + '_;

  // ── Eras ──────────────────────────────────────────────────────────────

  /// Non-deleted eras in chronological order, limited to `window`.
  fn list_eras(
    &self,
    window: Window,
  ) -> impl Future<Output = Result<Vec<Era>, Self::Error>> + Send + '_;

  fn get_era(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Era>, Self::Error>> + Send + '_;

  fn era_timeline(
    &self,
    window: Window,
  ) -> impl Future<Output = Result<Vec<TimelineEntry>, Self::Error>> + Send + '_;

  // ── Images ────────────────────────────────────────────────────────────

  fn list_images(
    &self,
    query: ImageQuery,
  ) -> impl Future<Output = Result<Vec<SiteImage>, Self::Error>> + Send + '_;

  fn count_images(
    &self,
    query: ImageQuery,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn get_image(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<SiteImage>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Record a freshly issued session key.
  fn register_session(
    &self,
    session: SessionContext,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Whether `session` was issued by [`GeoStore::register_session`].
  fn session_exists(
    &self,
    session: SessionContext,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Bucket list ───────────────────────────────────────────────────────

  /// Create an item for a visible site.
  ///
  /// Fails with a duplicate error carrying the existing item id if the
  /// session already has an active item for the site, and with a not-found
  /// error if the site is not visible. The duplicate check comes first.
  fn add_bucket_item(
    &self,
    session: SessionContext,
    input: NewBucketItem,
  ) -> impl Future<Output = Result<BucketListItem, Self::Error>> + Send + '_;

  fn list_bucket_items(
    &self,
    session: SessionContext,
    query: BucketQuery,
  ) -> impl Future<Output = Result<Vec<BucketListItem>, Self::Error>> + Send + '_;

  fn count_bucket_items(
    &self,
    session: SessionContext,
    query: BucketQuery,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// `None` if the item is deleted or belongs to another session.
  fn get_bucket_item(
    &self,
    session: SessionContext,
    id: i64,
  ) -> impl Future<Output = Result<Option<BucketListItem>, Self::Error>> + Send + '_;

  /// Apply a state transition and persist it. `None` if not found in this
  /// session.
  fn apply_bucket_action(
    &self,
    session: SessionContext,
    id: i64,
    action: BucketAction,
  ) -> impl Future<Output = Result<Option<BucketListItem>, Self::Error>> + Send + '_;

  /// Soft-delete. Returns `false` if there was nothing to delete.
  fn remove_bucket_item(
    &self,
    session: SessionContext,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn bucket_statistics(
    &self,
    session: SessionContext,
  ) -> impl Future<Output = Result<BucketStatistics, Self::Error>> + Send + '_;

  // ── Health ────────────────────────────────────────────────────────────

  /// Run a trivial statement to prove the store is reachable.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
