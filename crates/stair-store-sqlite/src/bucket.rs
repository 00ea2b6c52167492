//! Issued sessions and bucket-list persistence. Every bucket-list statement
//! here is scoped by session key.

use std::collections::BTreeMap;

use rusqlite::{types::Value, OptionalExtension as _};
use stair_core::{
  bucket::{BucketAction, BucketListItem, BucketQuery, BucketStatistics, NewBucketItem},
  session::SessionContext,
  stats::NamedCount,
};

use crate::{
  encode::{encode_dt, now, RawBucketItem, BUCKET_COLUMNS},
  error::boxed,
  sites::VISIBLE,
  Error, Result, SqliteStore,
};

const BUCKET_FROM: &str = "FROM bucket_list_item b
  JOIN historical_site s ON s.id = b.site_id
  LEFT JOIN county c ON c.id = s.county_id
  LEFT JOIN historical_era e ON e.id = s.era_id";

fn load(
  conn: &rusqlite::Connection,
  session_key: &str,
  id: i64,
) -> rusqlite::Result<Option<RawBucketItem>> {
  conn
    .query_row(
      &format!(
        "SELECT {BUCKET_COLUMNS} {BUCKET_FROM}
          WHERE b.id = ?1 AND b.session_key = ?2 AND b.is_deleted = 0"
      ),
      rusqlite::params![id, session_key],
      RawBucketItem::from_row,
    )
    .optional()
}

fn active_item_id(
  conn: &rusqlite::Connection,
  session_key: &str,
  site_id: i64,
) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row(
      "SELECT id FROM bucket_list_item
        WHERE session_key = ?1 AND site_id = ?2 AND is_deleted = 0",
      rusqlite::params![session_key, site_id],
      |row| row.get(0),
    )
    .optional()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

fn list_filter(session_key: String, query: &BucketQuery) -> (String, Vec<Value>) {
  let mut sql = String::from("WHERE b.session_key = ?1 AND b.is_deleted = 0");
  let mut params: Vec<Value> = vec![session_key.into()];
  if let Some(status) = query.status {
    params.push(status.as_str().to_owned().into());
    sql.push_str(&format!(" AND b.status = ?{}", params.len()));
  }
  (sql, params)
}

impl SqliteStore {
  pub(crate) async fn insert_session(&self, session: SessionContext) -> Result<()> {
    let created_at = encode_dt(now());
    self
      .run(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO session (key, created_at) VALUES (?1, ?2)",
          rusqlite::params![session.key(), created_at],
        )?;
        Ok(())
      })
      .await
  }

  pub(crate) async fn has_session(&self, session: SessionContext) -> Result<bool> {
    self
      .run(move |conn| {
        Ok(
          conn
            .query_row("SELECT 1 FROM session WHERE key = ?1", [session.key()], |_| Ok(()))
            .optional()?
            .is_some(),
        )
      })
      .await
  }

  pub(crate) async fn insert_bucket_item(
    &self,
    session: SessionContext,
    input: NewBucketItem,
  ) -> Result<BucketListItem> {
    let key = session.key().to_owned();
    let now = now();
    let added_at = encode_dt(now);
    let visited_at = input.initial_visited_at(now).map(encode_dt);
    let status = input.status.as_str();
    let site_id = input.site_id;

    let raw = self
      .run(move |conn| {
        let tx = conn.transaction()?;

        if let Some(existing) = active_item_id(&tx, &key, site_id)? {
          return Err(boxed(Error::Duplicate(existing)));
        }

        let visible: bool = tx.query_row(
          &format!("SELECT EXISTS (SELECT 1 FROM historical_site s WHERE s.id = ?1 AND {VISIBLE})"),
          [site_id],
          |row| row.get(0),
        )?;
        if !visible {
          return Err(boxed(Error::SiteNotFound(site_id)));
        }

        let inserted = tx.execute(
          "INSERT INTO bucket_list_item
             (session_key, site_id, status, added_at, visited_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?4)",
          rusqlite::params![key, site_id, status, added_at, visited_at],
        );
        match inserted {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            let existing = active_item_id(&tx, &key, site_id)?.unwrap_or_default();
            return Err(boxed(Error::Duplicate(existing)));
          }
          Err(e) => return Err(e.into()),
        }

        let id = tx.last_insert_rowid();
        let raw = load(&tx, &key, id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.ok_or(Error::SiteNotFound(site_id))?.into_item()
  }

  pub(crate) async fn bucket_item(
    &self,
    session: SessionContext,
    id: i64,
  ) -> Result<Option<BucketListItem>> {
    let key = session.key().to_owned();
    let raw = self.run(move |conn| Ok(load(conn, &key, id)?)).await?;
    raw.map(RawBucketItem::into_item).transpose()
  }

  pub(crate) async fn bucket_items(
    &self,
    session: SessionContext,
    query: BucketQuery,
  ) -> Result<Vec<BucketListItem>> {
    let (filter, mut params) = list_filter(session.key().to_owned(), &query);
    let mut order: Vec<String> = query
      .order
      .iter()
      .map(|o| format!("b.{} {}", o.field.column(), if o.descending { "DESC" } else { "ASC" }))
      .collect();
    order.push("b.id DESC".to_owned());
    params.push((query.window.limit as i64).into());
    params.push((query.window.offset as i64).into());
    let sql = format!(
      "SELECT {BUCKET_COLUMNS} {BUCKET_FROM} {filter}
        ORDER BY {}
        LIMIT ?{} OFFSET ?{}",
      order.join(", "),
      params.len() - 1,
      params.len(),
    );

    let raws = self
      .run(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawBucketItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawBucketItem::into_item).collect()
  }

  pub(crate) async fn bucket_item_count(
    &self,
    session: SessionContext,
    query: BucketQuery,
  ) -> Result<usize> {
    let (filter, params) = list_filter(session.key().to_owned(), &query);
    let sql = format!("SELECT COUNT(*) FROM bucket_list_item b {filter}");
    let n: i64 = self
      .run(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))?)
      })
      .await?;
    Ok(n.max(0) as usize)
  }

  /// Load, transition and persist in one transaction.
  pub(crate) async fn transition_bucket_item(
    &self,
    session: SessionContext,
    id: i64,
    action: BucketAction,
  ) -> Result<Option<BucketListItem>> {
    let key = session.key().to_owned();
    let now = now();

    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let Some(raw) = load(&tx, &key, id)? else {
          return Ok(None);
        };
        let mut item = raw.into_item().map_err(boxed)?;
        item.apply(action, now);

        let photo = item.photo.as_ref();
        tx.execute(
          "UPDATE bucket_list_item
              SET status = ?1, visited_at = ?2, photo_path = ?3, photo_hash = ?4,
                  photo_media_type = ?5, photo_caption = ?6, updated_at = ?7
            WHERE id = ?8 AND session_key = ?9 AND is_deleted = 0",
          rusqlite::params![
            item.status.as_str(),
            item.visited_at.map(encode_dt),
            photo.map(|p| p.path.as_str()),
            photo.map(|p| p.content_hash.as_str()),
            photo.map(|p| p.media_type.as_str()),
            item.photo_caption,
            encode_dt(item.updated_at),
            id,
            key,
          ],
        )?;
        tx.commit()?;
        Ok(Some(item))
      })
      .await
  }

  pub(crate) async fn soft_delete_bucket_item(&self, session: SessionContext, id: i64) -> Result<bool> {
    let key = session.key().to_owned();
    let now = encode_dt(now());
    let changed = self
      .run(move |conn| {
        Ok(conn.execute(
          "UPDATE bucket_list_item SET is_deleted = 1, updated_at = ?1
            WHERE id = ?2 AND session_key = ?3 AND is_deleted = 0",
          rusqlite::params![now, id, key],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  pub(crate) async fn bucket_summary(&self, session: SessionContext) -> Result<BucketStatistics> {
    let key = session.key().to_owned();
    self
      .run(move |conn| {
        let (total, wishlist, visited, counties_explored): (i64, i64, i64, i64) = conn.query_row(
          "SELECT COUNT(*),
                  COALESCE(SUM(b.status = 'wishlist'), 0),
                  COALESCE(SUM(b.status = 'visited'), 0),
                  COUNT(DISTINCT CASE WHEN b.status = 'visited' THEN s.county_id END)
             FROM bucket_list_item b
             JOIN historical_site s ON s.id = b.site_id
            WHERE b.session_key = ?1 AND b.is_deleted = 0",
          [&key],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        let mut stmt = conn.prepare(
          "SELECT c.name_en, COUNT(b.id) AS n
             FROM bucket_list_item b
             JOIN historical_site s ON s.id = b.site_id
             LEFT JOIN county c ON c.id = s.county_id
            WHERE b.session_key = ?1 AND b.is_deleted = 0
            GROUP BY s.county_id
            ORDER BY n DESC, c.name_en",
        )?;
        let by_county = stmt
          .query_map([&key], |row| Ok(NamedCount { name: row.get(0)?, count: row.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT s.site_type, COUNT(b.id)
             FROM bucket_list_item b
             JOIN historical_site s ON s.id = b.site_id
            WHERE b.session_key = ?1 AND b.is_deleted = 0
            GROUP BY s.site_type",
        )?;
        let by_site_type = stmt
          .query_map([&key], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

        Ok(BucketStatistics { total, wishlist, visited, counties_explored, by_county, by_site_type })
      })
      .await
  }
}
