//! [`SqliteStore`]: the SQLite implementation of [`GeoStore`].

use std::{path::Path, time::Duration};

use stair_core::{
  boundary::{BoundaryDetail, BoundaryLayer, BoundaryQuery, CountySummary, ProvinceSummary},
  bucket::{BucketAction, BucketListItem, BucketQuery, BucketStatistics, NewBucketItem},
  era::{Era, TimelineEntry},
  pager::Window,
  planner::SiteQuery,
  session::SessionContext,
  site::{SiteDetail, SiteImage, SiteSummary},
  stats::SiteStatistics,
  store::{GeoStore, ImageQuery},
};

use crate::{
  schema::{SCHEMA, SCHEMA_VERSION},
  spatial, Error, Result,
};

/// Tunables for a [`SqliteStore`].
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
  /// Upper bound on the wall-clock time of any single store call.
  pub statement_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self { Self { statement_timeout: Duration::from_millis(5_000) } }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Stair geometry store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  options:         StoreOptions,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, options };
    store.init_schema(true).await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(StoreOptions::default()).await
  }

  pub async fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, options };
    store.init_schema(false).await?;
    Ok(store)
  }

  async fn init_schema(&self, wal: bool) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        spatial::register(conn)?;
        if wal {
          conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread under the statement deadline.
  pub(crate) async fn run<R, F>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let timeout = self.options.statement_timeout;
    let out = self
      .conn
      .call(move |conn| spatial::with_deadline(conn, timeout, f))
      .await?;
    Ok(out)
  }
}

// ─── GeoStore impl ───────────────────────────────────────────────────────────

impl GeoStore for SqliteStore {
  type Error = Error;

  // ── Sites ─────────────────────────────────────────────────────────────

  async fn search_sites(&self, query: SiteQuery) -> Result<Vec<SiteSummary>> {
    self.query_sites(query).await
  }

  async fn count_sites(&self, query: SiteQuery) -> Result<usize> {
    self.count_matching_sites(query).await
  }

  async fn get_site(&self, id: i64) -> Result<Option<SiteDetail>> {
    self.site_detail(id).await
  }

  async fn site_statistics(&self) -> Result<SiteStatistics> {
    self.catalog_statistics().await
  }

  // ── Boundaries ────────────────────────────────────────────────────────

  async fn materialize_boundaries(&self, query: BoundaryQuery) -> Result<String> {
    self.feature_collection(query).await
  }

  async fn get_boundary(&self, layer: BoundaryLayer, id: i64) -> Result<Option<BoundaryDetail>> {
    self.boundary_detail(layer, id).await
  }

  async fn list_provinces(&self, window: Window) -> Result<Vec<ProvinceSummary>> {
    self.province_summaries(window).await
  }

  async fn list_counties(&self, province: Option<i64>, window: Window) -> Result<Vec<CountySummary>> {
    self.county_summaries(province, window).await
  }

  // ── Eras ──────────────────────────────────────────────────────────────

  async fn list_eras(&self, window: Window) -> Result<Vec<Era>> { self.eras(window).await }

  async fn get_era(&self, id: i64) -> Result<Option<Era>> { self.era(id).await }

  async fn era_timeline(&self, window: Window) -> Result<Vec<TimelineEntry>> {
    self.timeline(window).await
  }

  // ── Images ────────────────────────────────────────────────────────────

  async fn list_images(&self, query: ImageQuery) -> Result<Vec<SiteImage>> {
    self.images(query).await
  }

  async fn count_images(&self, query: ImageQuery) -> Result<usize> {
    self.image_count(query).await
  }

  async fn get_image(&self, id: i64) -> Result<Option<SiteImage>> { self.image(id).await }

  // ── Sessions ──────────────────────────────────────────────────────────

  async fn register_session(&self, session: SessionContext) -> Result<()> {
    self.insert_session(session).await
  }

  async fn session_exists(&self, session: SessionContext) -> Result<bool> {
    self.has_session(session).await
  }

  // ── Bucket list ───────────────────────────────────────────────────────

  async fn add_bucket_item(
    &self,
    session: SessionContext,
    input: NewBucketItem,
  ) -> Result<BucketListItem> {
    self.insert_bucket_item(session, input).await
  }

  async fn list_bucket_items(
    &self,
    session: SessionContext,
    query: BucketQuery,
  ) -> Result<Vec<BucketListItem>> {
    self.bucket_items(session, query).await
  }

  async fn count_bucket_items(&self, session: SessionContext, query: BucketQuery) -> Result<usize> {
    self.bucket_item_count(session, query).await
  }

  async fn get_bucket_item(&self, session: SessionContext, id: i64) -> Result<Option<BucketListItem>> {
    self.bucket_item(session, id).await
  }

  async fn apply_bucket_action(
    &self,
    session: SessionContext,
    id: i64,
    action: BucketAction,
  ) -> Result<Option<BucketListItem>> {
    self.transition_bucket_item(session, id, action).await
  }

  async fn remove_bucket_item(&self, session: SessionContext, id: i64) -> Result<bool> {
    self.soft_delete_bucket_item(session, id).await
  }

  async fn bucket_statistics(&self, session: SessionContext) -> Result<BucketStatistics> {
    self.bucket_summary(session).await
  }

  // ── Health ────────────────────────────────────────────────────────────

  async fn ping(&self) -> Result<()> {
    self
      .run(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await
  }
}
