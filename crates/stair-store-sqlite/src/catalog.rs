//! Eras and site images.

use rusqlite::{types::Value, OptionalExtension as _};
use stair_core::{
  era::{Era, TimelineEntry},
  pager::Window,
  site::SiteImage,
  store::ImageQuery,
};

use crate::{
  encode::{era_from_row, RawImage, ERA_COLUMNS, IMAGE_COLUMNS},
  sites::VISIBLE,
  Result, SqliteStore,
};

/// Image predicates: not deleted, public, attached to a visible site.
fn image_filter(query: &ImageQuery) -> (String, Vec<Value>) {
  let mut sql = format!(
    "FROM site_image i JOIN historical_site s ON s.id = i.site_id
     WHERE i.is_deleted = 0 AND i.is_public = 1 AND {VISIBLE}"
  );
  let mut params: Vec<Value> = Vec::new();
  if let Some(site) = query.site_id {
    params.push(site.into());
    sql.push_str(&format!(" AND i.site_id = ?{}", params.len()));
  }
  if let Some(primary) = query.is_primary {
    params.push(i64::from(primary).into());
    sql.push_str(&format!(" AND i.is_primary = ?{}", params.len()));
  }
  (sql, params)
}

/// `LIMIT ?1 OFFSET ?2` bindings for a [`Window`].
pub(crate) fn window_params(window: Window) -> [i64; 2] {
  [window.limit as i64, window.offset as i64]
}

impl SqliteStore {
  pub(crate) async fn eras(&self, window: Window) -> Result<Vec<Era>> {
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ERA_COLUMNS} FROM historical_era e
            WHERE e.is_deleted = 0
            ORDER BY e.start_year, e.display_order, e.id
            LIMIT ?1 OFFSET ?2"
        ))?;
        let eras = stmt
          .query_map(window_params(window), era_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(eras)
      })
      .await
  }

  pub(crate) async fn era(&self, id: i64) -> Result<Option<Era>> {
    self
      .run(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ERA_COLUMNS} FROM historical_era e WHERE e.id = ?1 AND e.is_deleted = 0"),
              [id],
              era_from_row,
            )
            .optional()?,
        )
      })
      .await
  }

  /// Eras in chronological order with the number of visible sites in each.
  pub(crate) async fn timeline(&self, window: Window) -> Result<Vec<TimelineEntry>> {
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ERA_COLUMNS},
                  (SELECT COUNT(*) FROM historical_site s WHERE s.era_id = e.id AND {VISIBLE})
             FROM historical_era e
            WHERE e.is_deleted = 0
            ORDER BY e.start_year, e.display_order, e.id
            LIMIT ?1 OFFSET ?2"
        ))?;
        let entries = stmt
          .query_map(window_params(window), |row| {
            Ok(TimelineEntry::new(era_from_row(row)?, row.get(9)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
      })
      .await
  }

  pub(crate) async fn images(&self, query: ImageQuery) -> Result<Vec<SiteImage>> {
    let (filter, mut params) = image_filter(&query);
    params.push((query.window.limit as i64).into());
    params.push((query.window.offset as i64).into());
    let sql = format!(
      "SELECT {IMAGE_COLUMNS} {filter}
       ORDER BY i.site_id, i.display_order, i.id
       LIMIT ?{} OFFSET ?{}",
      params.len() - 1,
      params.len()
    );

    let raws = self
      .run(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawImage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawImage::into_image).collect()
  }

  pub(crate) async fn image_count(&self, query: ImageQuery) -> Result<usize> {
    let (filter, params) = image_filter(&query);
    let sql = format!("SELECT COUNT(*) {filter}");
    let n: i64 = self
      .run(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))?)
      })
      .await?;
    Ok(n.max(0) as usize)
  }

  pub(crate) async fn image(&self, id: i64) -> Result<Option<SiteImage>> {
    let raw = self
      .run(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {IMAGE_COLUMNS} FROM site_image i
                   JOIN historical_site s ON s.id = i.site_id
                  WHERE i.id = ?1 AND i.is_deleted = 0 AND i.is_public = 1 AND {VISIBLE}"
              ),
              [id],
              RawImage::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawImage::into_image).transpose()
  }
}
