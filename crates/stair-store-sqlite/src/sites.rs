//! Site reads: planned searches, single-site detail and catalog statistics.

use std::collections::{BTreeMap, HashMap};

use rusqlite::{types::Value, OptionalExtension as _};
use stair_core::{
  planner::{Projection, SiteOrder, SiteQuery, SpatialFilter, BBox},
  site::{ImageThumb, SiteDetail, SiteSummary},
  stats::{EraCount, NamedCount, SiteStatistics, TOP_COUNTIES},
};

use crate::{
  encode::{RawImage, RawSiteDetail, RawSiteSummary, RawSource, IMAGE_COLUMNS},
  Result, SqliteStore,
};

/// The visibility rule applied to every public site read.
pub(crate) const VISIBLE: &str = "s.approval_status = 'approved' AND s.is_deleted = 0";

// ─── SQL assembly ────────────────────────────────────────────────────────────

/// Accumulates `WHERE` conditions and their positional parameters.
#[derive(Default)]
struct Conditions {
  clauses: Vec<String>,
  params:  Vec<Value>,
}

impl Conditions {
  /// Push a parameter and return its placeholder.
  fn bind(&mut self, v: impl Into<Value>) -> String {
    self.params.push(v.into());
    format!("?{}", self.params.len())
  }

  fn push(&mut self, clause: String) { self.clauses.push(clause); }

  fn where_clause(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("AND {}", self.clauses.join(" AND "))
    }
  }
}

/// Escape `LIKE` metacharacters; pairs with `ESCAPE '\'`.
fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for ch in text.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(ch);
  }
  out.push('%');
  out
}

/// Index prefilter plus exact, edge-inclusive coordinate test.
fn push_bbox(conds: &mut Conditions, b: &BBox) {
  let min_lon = conds.bind(b.min_lon);
  let max_lon = conds.bind(b.max_lon);
  let min_lat = conds.bind(b.min_lat);
  let max_lat = conds.bind(b.max_lat);
  conds.push(format!(
    "r.max_lon >= {min_lon} AND r.min_lon <= {max_lon} AND r.max_lat >= {min_lat} AND r.min_lat <= {max_lat}"
  ));
  conds.push(format!(
    "s.longitude BETWEEN {min_lon} AND {max_lon} AND s.latitude BETWEEN {min_lat} AND {max_lat}"
  ));
}

/// Everything after `SELECT ...`: joins and predicates. Returns the SQL
/// fragment, the bound parameters and, for proximity queries, the distance
/// expression.
fn from_clause(query: &SiteQuery) -> (String, Conditions, Option<String>) {
  let mut conds = Conditions::default();
  let mut distance = None;

  let rtree_join = if query.spatial.is_some() {
    "JOIN site_rtree r ON r.id = s.id"
  } else {
    ""
  };

  match &query.spatial {
    Some(SpatialFilter::Within(b)) => push_bbox(&mut conds, b),
    Some(SpatialFilter::Near { origin, radius_km }) => {
      push_bbox(&mut conds, &BBox::around(*origin, *radius_km));
      let lon = conds.bind(origin.lon);
      let lat = conds.bind(origin.lat);
      let expr = format!("st_distance_km(s.longitude, s.latitude, {lon}, {lat})");
      let radius = conds.bind(*radius_km);
      conds.push(format!("{expr} <= {radius}"));
      distance = Some(expr);
    }
    None => {}
  }

  let f = &query.filters;
  if let Some(id) = f.site_id {
    let p = conds.bind(id);
    conds.push(format!("s.id = {p}"));
  }
  if let Some(id) = f.county {
    let p = conds.bind(id);
    conds.push(format!("s.county_id = {p}"));
  }
  if let Some(id) = f.province {
    let p = conds.bind(id);
    conds.push(format!("s.county_id IN (SELECT id FROM county WHERE province_id = {p})"));
  }
  if let Some(id) = f.era {
    let p = conds.bind(id);
    conds.push(format!("s.era_id = {p}"));
  }
  if !f.site_types.is_empty() {
    let placeholders: Vec<String> = f
      .site_types
      .iter()
      .map(|t| conds.bind(t.as_str().to_owned()))
      .collect();
    conds.push(format!("s.site_type IN ({})", placeholders.join(", ")));
  }
  if let Some(level) = f.significance {
    let p = conds.bind(i64::from(level));
    conds.push(format!("s.significance_level = {p}"));
  }
  if let Some(level) = f.significance_gte {
    let p = conds.bind(i64::from(level));
    conds.push(format!("s.significance_level >= {p}"));
  }
  if let Some(level) = f.significance_lte {
    let p = conds.bind(i64::from(level));
    conds.push(format!("s.significance_level <= {p}"));
  }
  for (column, flag) in [
    ("national_monument", f.national_monument),
    ("unesco_site", f.unesco_site),
    ("is_public_access", f.is_public_access),
  ] {
    if let Some(flag) = flag {
      let p = conds.bind(i64::from(flag));
      conds.push(format!("s.{column} = {p}"));
    }
  }
  if let Some(text) = &f.search {
    let p = conds.bind(like_pattern(text));
    conds.push(format!(
      "(s.name_en LIKE {p} ESCAPE '\\' OR s.name_ga LIKE {p} ESCAPE '\\' \
       OR s.description_en LIKE {p} ESCAPE '\\' OR s.description_ga LIKE {p} ESCAPE '\\')"
    ));
  }

  let popup_joins = match query.projection {
    Projection::Popup => {
      "LEFT JOIN county c ON c.id = s.county_id LEFT JOIN historical_era e ON e.id = s.era_id"
    }
    Projection::Marker => "",
  };

  let sql = format!(
    "FROM historical_site s {rtree_join} {popup_joins} WHERE {VISIBLE} {}",
    conds.where_clause()
  );
  (sql, conds, distance)
}

fn order_clause(order: &SiteOrder) -> String {
  match order {
    SiteOrder::Distance => "ORDER BY distance_km ASC, s.id".to_owned(),
    SiteOrder::Fields(keys) => {
      let mut parts: Vec<String> = keys
        .iter()
        .map(|k| format!("s.{} {}", k.field.column(), if k.descending { "DESC" } else { "ASC" }))
        .collect();
      parts.push("s.id".to_owned());
      format!("ORDER BY {}", parts.join(", "))
    }
  }
}

/// Build the page query. Columns match [`RawSiteSummary::from_row`].
fn select_sql(query: &SiteQuery) -> (String, Vec<Value>) {
  let (from, mut conds, distance) = from_clause(query);
  let chars = conds.bind(query.description_chars as i64);
  let popup_cols = match query.projection {
    Projection::Popup => {
      "c.name_en, e.name_en, e.color_hex, s.date_established, s.is_public_access, s.website_url"
    }
    Projection::Marker => "NULL, NULL, NULL, NULL, NULL, NULL",
  };
  let distance = distance.unwrap_or_else(|| "NULL".to_owned());
  let limit = conds.bind(query.window.limit as i64);
  let offset = conds.bind(query.window.offset as i64);

  let sql = format!(
    "SELECT s.id, s.name_en, s.name_ga, s.site_type, s.significance_level,
            s.national_monument, s.unesco_site,
            substr(s.description_en, 1, {chars}), substr(s.description_ga, 1, {chars}),
            s.longitude, s.latitude, s.elevation, s.county_id, s.era_id,
            {popup_cols},
            {distance} AS distance_km
     {from}
     {order}
     LIMIT {limit} OFFSET {offset}",
    order = order_clause(&query.order),
  );
  (sql, conds.params)
}

fn count_sql(query: &SiteQuery) -> (String, Vec<Value>) {
  let (from, conds, _) = from_clause(query);
  (format!("SELECT COUNT(*) {from}"), conds.params)
}

/// First public image per site for a whole page, primary first then by
/// display order.
const FIRST_IMAGES: &str = "
SELECT id, site_id, image_url, thumbnail_url, is_primary FROM (
    SELECT i.id, i.site_id, i.image_url, i.thumbnail_url, i.is_primary,
           ROW_NUMBER() OVER (
               PARTITION BY i.site_id
               ORDER BY i.is_primary DESC, i.display_order, i.id
           ) AS rn
      FROM site_image i
     WHERE i.is_deleted = 0 AND i.is_public = 1
       AND i.site_id IN (SELECT value FROM json_each(?1))
) WHERE rn = 1";

fn first_images(
  conn: &rusqlite::Connection,
  site_ids: &[i64],
) -> rusqlite::Result<HashMap<i64, ImageThumb>> {
  if site_ids.is_empty() {
    return Ok(HashMap::new());
  }
  let ids = format!(
    "[{}]",
    site_ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",")
  );
  let mut stmt = conn.prepare(FIRST_IMAGES)?;
  let rows = stmt
    .query_map([ids], |row| {
      Ok((
        row.get::<_, i64>(1)?,
        ImageThumb {
          id:            row.get(0)?,
          image_url:     row.get(2)?,
          thumbnail_url: row.get(3)?,
          is_primary:    row.get(4)?,
        },
      ))
    })?
    .collect::<rusqlite::Result<HashMap<_, _>>>()?;
  Ok(rows)
}

// ─── Queries ─────────────────────────────────────────────────────────────────

impl SqliteStore {
  pub(crate) async fn query_sites(&self, query: SiteQuery) -> Result<Vec<SiteSummary>> {
    let projection = query.projection;
    let (sql, params) = select_sql(&query);

    let (raws, mut images) = self
      .run(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let raws = stmt
          .query_map(rusqlite::params_from_iter(params), RawSiteSummary::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let ids: Vec<i64> = raws.iter().map(|r| r.id).collect();
        let images = first_images(conn, &ids)?;
        Ok((raws, images))
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| {
        let image = images.remove(&raw.id);
        raw.into_summary(projection, image)
      })
      .collect()
  }

  pub(crate) async fn count_matching_sites(&self, query: SiteQuery) -> Result<usize> {
    let (sql, params) = count_sql(&query);
    let count: i64 = self
      .run(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))?)
      })
      .await?;
    Ok(count.max(0) as usize)
  }

  pub(crate) async fn site_detail(&self, id: i64) -> Result<Option<SiteDetail>> {
    let found = self
      .run(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT s.*,
                      c.name_en AS county_name, c.name_ga AS county_name_ga,
                      p.name_en AS province_name,
                      e.name_en AS era_name, e.name_ga AS era_name_ga,
                      e.color_hex AS era_color
                 FROM historical_site s
                 LEFT JOIN county c ON c.id = s.county_id
                 LEFT JOIN province p ON p.id = c.province_id
                 LEFT JOIN historical_era e ON e.id = s.era_id
                WHERE s.id = ?1 AND {VISIBLE}"
            ),
            [id],
            RawSiteDetail::from_row,
          )
          .optional()?;
        let Some(raw) = raw else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(&format!(
          "SELECT {IMAGE_COLUMNS} FROM site_image i
            WHERE i.site_id = ?1 AND i.is_deleted = 0 AND i.is_public = 1
            ORDER BY i.is_primary DESC, i.display_order, i.id"
        ))?;
        let images = stmt
          .query_map([id], RawImage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT id, source_type, title, author, publication_year, publisher, url,
                  isbn, pages, notes, reliability_score
             FROM site_source
            WHERE site_id = ?1 AND is_deleted = 0
            ORDER BY reliability_score DESC, id",
        )?;
        let sources = stmt
          .query_map([id], RawSource::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((raw, images, sources)))
      })
      .await?;

    let Some((raw, images, sources)) = found else {
      return Ok(None);
    };
    let images = images.into_iter().map(RawImage::into_image).collect::<Result<Vec<_>>>()?;
    let sources = sources.into_iter().map(RawSource::into_source).collect::<Result<Vec<_>>>()?;
    raw.into_detail(images, sources).map(Some)
  }

  pub(crate) async fn catalog_statistics(&self) -> Result<SiteStatistics> {
    self
      .run(|conn| {
        let (total_sites, national_monuments, unesco_sites): (i64, i64, i64) = conn.query_row(
          &format!(
            "SELECT COUNT(*), COALESCE(SUM(s.national_monument), 0), COALESCE(SUM(s.unesco_site), 0)
               FROM historical_site s WHERE {VISIBLE}"
          ),
          [],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT s.site_type, COUNT(*) FROM historical_site s WHERE {VISIBLE} GROUP BY s.site_type"
        ))?;
        let by_site_type = stmt
          .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT e.name_en, e.color_hex, COUNT(s.id)
             FROM historical_site s
             LEFT JOIN historical_era e ON e.id = s.era_id
            WHERE {VISIBLE}
            GROUP BY s.era_id
            ORDER BY e.start_year IS NULL, e.start_year"
        ))?;
        let by_era = stmt
          .query_map([], |row| {
            Ok(EraCount { name: row.get(0)?, color_hex: row.get(1)?, count: row.get(2)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT c.name_en, COUNT(s.id) AS n
             FROM historical_site s
             LEFT JOIN county c ON c.id = s.county_id
            WHERE {VISIBLE}
            GROUP BY s.county_id
            ORDER BY n DESC, c.name_en
            LIMIT ?1"
        ))?;
        let by_county = stmt
          .query_map([TOP_COUNTIES as i64], |row| {
            Ok(NamedCount { name: row.get(0)?, count: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT s.significance_level, COUNT(*) FROM historical_site s
            WHERE {VISIBLE} GROUP BY s.significance_level"
        ))?;
        let by_significance = stmt
          .query_map([], |row| Ok((row.get::<_, u8>(0)?, row.get::<_, i64>(1)?)))?
          .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;

        Ok(SiteStatistics {
          total_sites,
          national_monuments,
          unesco_sites,
          by_site_type,
          by_era,
          by_county,
          by_significance,
        })
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use stair_core::planner::{plan_list, plan_viewport, ListParams, ViewportParams};

  use super::*;

  #[test]
  fn like_pattern_escapes_metacharacters() {
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
  }

  #[test]
  fn viewport_sql_joins_rtree_and_binds_bounds_once() {
    let q = plan_viewport(&ViewportParams {
      minx: Some("-9".into()),
      miny: Some("52".into()),
      maxx: Some("-8".into()),
      maxy: Some("53".into()),
    })
    .unwrap();
    let (sql, params) = count_sql(&q);
    assert!(sql.contains("JOIN site_rtree r"));
    assert!(sql.contains("s.longitude BETWEEN ?1 AND ?2"));
    assert_eq!(params.len(), 4);
  }

  #[test]
  fn list_sql_without_spatial_filter_skips_rtree() {
    let q = plan_list(&ListParams::default()).unwrap();
    let (sql, _) = select_sql(&q);
    assert!(!sql.contains("site_rtree"));
    assert!(sql.contains("ORDER BY s.significance_level DESC, s.name_en ASC, s.id"));
  }
}

