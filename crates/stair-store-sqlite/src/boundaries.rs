//! The boundary materializer.
//!
//! A whole layer is rendered by one aggregate statement: each row's polygon
//! is simplified and coerced to a multipolygon by the registered spatial
//! functions, wrapped into a GeoJSON Feature with `json_object`, and the
//! features are folded into a FeatureCollection with `json_group_array`. The
//! result is a single text value handed back to the caller untouched.

use rusqlite::OptionalExtension as _;
use serde_json::value::RawValue;
use stair_core::{
  boundary::{
    BoundaryDetail, BoundaryLayer, BoundaryQuery, CountySummary, ProvinceRef, ProvinceSummary,
  },
  pager::Window,
};

use crate::{catalog::window_params, sites::VISIBLE, Result, SqliteStore};

// ?1 tolerance (degrees), ?2 description length.
const PROVINCE_COLLECTION: &str = "
SELECT json_object(
    'type', 'FeatureCollection',
    'features', json_group_array(
        json_object(
            'type', 'Feature',
            'id', p.id,
            'geometry', json(st_multi(st_simplify_preserve_topology(p.geometry, ?1))),
            'properties', json_object(
                'id', p.id,
                'name_en', p.name_en,
                'name_ga', p.name_ga,
                'code', p.code,
                'area_km2', p.area_km2,
                'population', p.population,
                'description_en', substr(p.description_en, 1, ?2),
                'description_ga', substr(p.description_ga, 1, ?2),
                'county_count', (
                    SELECT COUNT(*) FROM county c
                     WHERE c.province_id = p.id AND c.is_deleted = 0
                ),
                'site_count', (
                    SELECT COUNT(*) FROM historical_site s
                      JOIN county c ON c.id = s.county_id
                     WHERE c.province_id = p.id AND VISIBLE_SITES
                )
            )
        ) ORDER BY p.name_en
    )
)
FROM province p
WHERE p.is_deleted = 0";

// ?1 tolerance, ?2 description length, ?3 parent province or NULL.
const COUNTY_COLLECTION: &str = "
SELECT json_object(
    'type', 'FeatureCollection',
    'features', json_group_array(
        json_object(
            'type', 'Feature',
            'id', c.id,
            'geometry', json(st_multi(st_simplify_preserve_topology(c.geometry, ?1))),
            'properties', json_object(
                'id', c.id,
                'name_en', c.name_en,
                'name_ga', c.name_ga,
                'code', c.code,
                'province', c.province_id,
                'province_name', p.name_en,
                'province_code', p.code,
                'area_km2', c.area_km2,
                'population', c.population,
                'description_en', substr(c.description_en, 1, ?2),
                'description_ga', substr(c.description_ga, 1, ?2),
                'site_count', (
                    SELECT COUNT(*) FROM historical_site s
                     WHERE s.county_id = c.id AND VISIBLE_SITES
                )
            )
        ) ORDER BY c.name_en
    )
)
FROM county c
JOIN province p ON p.id = c.province_id
WHERE c.is_deleted = 0 AND (?3 IS NULL OR c.province_id = ?3)";

impl SqliteStore {
  pub(crate) async fn feature_collection(&self, query: BoundaryQuery) -> Result<String> {
    let template = match query.layer {
      BoundaryLayer::Province => PROVINCE_COLLECTION,
      BoundaryLayer::County => COUNTY_COLLECTION,
    };
    let sql = template.replace("VISIBLE_SITES", VISIBLE);
    let chars = query.description_limit as i64;
    let parent = query.parent;
    let layer = query.layer;

    self
      .run(move |conn| {
        let json: String = match layer {
          BoundaryLayer::Province => {
            conn.query_row(&sql, rusqlite::params![query.tolerance, chars], |row| row.get(0))?
          }
          BoundaryLayer::County => conn.query_row(
            &sql,
            rusqlite::params![query.tolerance, chars, parent],
            |row| row.get(0),
          )?,
        };
        Ok(json)
      })
      .await
  }

  pub(crate) async fn boundary_detail(
    &self,
    layer: BoundaryLayer,
    id: i64,
  ) -> Result<Option<BoundaryDetail>> {
    let sql = match layer {
      BoundaryLayer::Province => format!(
        "SELECT p.id, p.name_en, p.name_ga, p.code, p.area_km2, p.population,
                p.description_en, p.description_ga, p.geometry,
                (SELECT COUNT(*) FROM county c WHERE c.province_id = p.id AND c.is_deleted = 0),
                (SELECT COUNT(*) FROM historical_site s JOIN county c ON c.id = s.county_id
                  WHERE c.province_id = p.id AND {VISIBLE}),
                NULL, NULL, NULL
           FROM province p
          WHERE p.id = ?1 AND p.is_deleted = 0"
      ),
      BoundaryLayer::County => format!(
        "SELECT c.id, c.name_en, c.name_ga, c.code, c.area_km2, c.population,
                c.description_en, c.description_ga, c.geometry,
                NULL,
                (SELECT COUNT(*) FROM historical_site s WHERE s.county_id = c.id AND {VISIBLE}),
                p.id, p.name_en, p.code
           FROM county c
           JOIN province p ON p.id = c.province_id
          WHERE c.id = ?1 AND c.is_deleted = 0"
      ),
    };

    type Row = (
      i64,
      String,
      String,
      String,
      Option<f64>,
      Option<i64>,
      String,
      String,
      String,
      Option<i64>,
      i64,
      Option<i64>,
      Option<String>,
      Option<String>,
    );

    let row: Option<Row> = self
      .run(move |conn| {
        Ok(
          conn
            .query_row(&sql, [id], |r| {
              Ok((
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
                r.get(6)?,
                r.get(7)?,
                r.get(8)?,
                r.get(9)?,
                r.get(10)?,
                r.get(11)?,
                r.get(12)?,
                r.get(13)?,
              ))
            })
            .optional()?,
        )
      })
      .await?;

    let Some((
      id,
      name_en,
      name_ga,
      code,
      area_km2,
      population,
      description_en,
      description_ga,
      geometry,
      county_count,
      site_count,
      province_id,
      province_name,
      province_code,
    )) = row
    else {
      return Ok(None);
    };

    let province = match (province_id, province_name, province_code) {
      (Some(id), Some(name_en), Some(code)) => Some(ProvinceRef { id, name_en, code }),
      _ => None,
    };

    Ok(Some(BoundaryDetail {
      layer,
      id,
      name_en,
      name_ga,
      code,
      area_km2,
      population,
      description_en,
      description_ga,
      geometry: RawValue::from_string(geometry)?,
      county_count,
      site_count,
      province,
    }))
  }

  pub(crate) async fn province_summaries(&self, window: Window) -> Result<Vec<ProvinceSummary>> {
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, name_en, name_ga, code FROM province
            WHERE is_deleted = 0 ORDER BY name_en
            LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt
          .query_map(window_params(window), |row| {
            Ok(ProvinceSummary {
              id:      row.get(0)?,
              name_en: row.get(1)?,
              name_ga: row.get(2)?,
              code:    row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }

  pub(crate) async fn county_summaries(
    &self,
    province: Option<i64>,
    window: Window,
  ) -> Result<Vec<CountySummary>> {
    let [limit, offset] = window_params(window);
    self
      .run(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT c.id, c.name_en, c.name_ga, c.code, c.province_id, p.name_en
             FROM county c
             JOIN province p ON p.id = c.province_id
            WHERE c.is_deleted = 0 AND (?1 IS NULL OR c.province_id = ?1)
            ORDER BY c.name_en
            LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![province, limit, offset], |row| {
            Ok(CountySummary {
              id:            row.get(0)?,
              name_en:       row.get(1)?,
              name_ga:       row.get(2)?,
              code:          row.get(3)?,
              province:      row.get(4)?,
              province_name: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }
}
