//! Catalog loading.
//!
//! The public API never writes to the catalog; boundaries, eras, sites and
//! their children arrive through these insert helpers (used by import
//! tooling and by tests).

use chrono::{NaiveDate, Utc};
use stair_core::site::{ApprovalStatus, Location, PreservationStatus, SiteType, SourceType};

use crate::{
  encode::{encode_date, encode_dt},
  Result, SqliteStore,
};

#[derive(Debug, Clone)]
pub struct NewProvince {
  pub name_en:        String,
  pub name_ga:        String,
  pub code:           String,
  pub geometry:       geojson::Geometry,
  pub area_km2:       Option<f64>,
  pub population:     Option<i64>,
  pub description_en: String,
  pub description_ga: String,
}

#[derive(Debug, Clone)]
pub struct NewCounty {
  pub name_en:        String,
  pub name_ga:        String,
  pub code:           String,
  pub province_id:    i64,
  pub geometry:       geojson::Geometry,
  pub area_km2:       Option<f64>,
  pub population:     Option<i64>,
  pub description_en: String,
  pub description_ga: String,
}

#[derive(Debug, Clone)]
pub struct NewEra {
  pub name_en:        String,
  pub name_ga:        String,
  pub start_year:     i32,
  pub end_year:       i32,
  pub display_order:  i32,
  pub color_hex:      String,
  pub description_en: String,
  pub description_ga: String,
}

#[derive(Debug, Clone)]
pub struct NewSite {
  pub name_en:             String,
  pub name_ga:             String,
  pub description_en:      String,
  pub description_ga:      String,
  pub location:            Location,
  pub county_id:           Option<i64>,
  pub era_id:              Option<i64>,
  pub date_established:    Option<NaiveDate>,
  pub date_abandoned:      Option<NaiveDate>,
  pub construction_period: String,
  pub site_type:           SiteType,
  pub significance_level:  u8,
  pub preservation_status: Option<PreservationStatus>,
  pub national_monument:   bool,
  pub unesco_site:         bool,
  pub is_public_access:    bool,
  pub visitor_center:      bool,
  pub admission_required:  bool,
  pub address:             String,
  pub eircode:             String,
  pub website_url:         String,
  pub phone_number:        String,
  pub data_source:         String,
  pub approval_status:     ApprovalStatus,
}

impl NewSite {
  /// A minimal site with regional significance, pending approval.
  pub fn new(name_en: impl Into<String>, site_type: SiteType, longitude: f64, latitude: f64) -> Self {
    Self {
      name_en: name_en.into(),
      name_ga: String::new(),
      description_en: String::new(),
      description_ga: String::new(),
      location: Location { longitude, latitude, elevation: None },
      county_id: None,
      era_id: None,
      date_established: None,
      date_abandoned: None,
      construction_period: String::new(),
      site_type,
      significance_level: 2,
      preservation_status: None,
      national_monument: false,
      unesco_site: false,
      is_public_access: true,
      visitor_center: false,
      admission_required: false,
      address: String::new(),
      eircode: String::new(),
      website_url: String::new(),
      phone_number: String::new(),
      data_source: String::new(),
      approval_status: ApprovalStatus::Pending,
    }
  }

  pub fn approved(mut self) -> Self {
    self.approval_status = ApprovalStatus::Approved;
    self
  }
}

#[derive(Debug, Clone)]
pub struct NewImage {
  pub site_id:       i64,
  pub image_url:     String,
  pub thumbnail_url: String,
  pub title_en:      String,
  pub title_ga:      String,
  pub caption_en:    String,
  pub caption_ga:    String,
  pub photographer:  String,
  pub photo_date:    Option<NaiveDate>,
  pub is_primary:    bool,
  pub display_order: i64,
  pub width_px:      Option<i64>,
  pub height_px:     Option<i64>,
  pub is_public:     bool,
}

impl NewImage {
  pub fn new(site_id: i64, image_url: impl Into<String>) -> Self {
    Self {
      site_id,
      image_url: image_url.into(),
      thumbnail_url: String::new(),
      title_en: String::new(),
      title_ga: String::new(),
      caption_en: String::new(),
      caption_ga: String::new(),
      photographer: String::new(),
      photo_date: None,
      is_primary: false,
      display_order: 0,
      width_px: None,
      height_px: None,
      is_public: true,
    }
  }
}

#[derive(Debug, Clone)]
pub struct NewSource {
  pub site_id:           i64,
  pub source_type:       SourceType,
  pub title:             String,
  pub author:            String,
  pub publication_year:  Option<i32>,
  pub publisher:         String,
  pub url:               String,
  pub isbn:              String,
  pub pages:             String,
  pub notes:             String,
  pub reliability_score: u8,
}

// ─── Inserts ─────────────────────────────────────────────────────────────────

impl SqliteStore {
  pub async fn insert_province(&self, p: NewProvince) -> Result<i64> {
    let geometry = serde_json::to_string(&p.geometry)?;
    let now = encode_dt(Utc::now());
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO province
             (name_en, name_ga, code, geometry, area_km2, population,
              description_en, description_ga, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            p.name_en,
            p.name_ga,
            p.code,
            geometry,
            p.area_km2,
            p.population,
            p.description_en,
            p.description_ga,
            now,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  pub async fn insert_county(&self, c: NewCounty) -> Result<i64> {
    let geometry = serde_json::to_string(&c.geometry)?;
    let now = encode_dt(Utc::now());
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO county
             (name_en, name_ga, code, province_id, geometry, area_km2, population,
              description_en, description_ga, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
          rusqlite::params![
            c.name_en,
            c.name_ga,
            c.code,
            c.province_id,
            geometry,
            c.area_km2,
            c.population,
            c.description_en,
            c.description_ga,
            now,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  pub async fn insert_era(&self, e: NewEra) -> Result<i64> {
    let now = encode_dt(Utc::now());
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO historical_era
             (name_en, name_ga, start_year, end_year, display_order, color_hex,
              description_en, description_ga, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            e.name_en,
            e.name_ga,
            e.start_year,
            e.end_year,
            e.display_order,
            e.color_hex,
            e.description_en,
            e.description_ga,
            now,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  pub async fn insert_site(&self, s: NewSite) -> Result<i64> {
    let now = encode_dt(Utc::now());
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO historical_site
             (name_en, name_ga, description_en, description_ga, longitude, latitude,
              elevation, elevation_meters, county_id, era_id, date_established,
              date_abandoned, construction_period, site_type, significance_level,
              preservation_status, national_monument, unesco_site, is_public_access,
              visitor_center, admission_required, address, eircode, website_url,
              phone_number, data_source, approval_status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                   ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?27)",
          rusqlite::params![
            s.name_en,
            s.name_ga,
            s.description_en,
            s.description_ga,
            s.location.longitude,
            s.location.latitude,
            s.location.elevation,
            s.county_id,
            s.era_id,
            s.date_established.map(encode_date),
            s.date_abandoned.map(encode_date),
            s.construction_period,
            s.site_type.as_str(),
            s.significance_level,
            s.preservation_status.map(PreservationStatus::as_str),
            s.national_monument,
            s.unesco_site,
            s.is_public_access,
            s.visitor_center,
            s.admission_required,
            s.address,
            s.eircode,
            s.website_url,
            s.phone_number,
            s.data_source,
            s.approval_status.as_str(),
            now,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  pub async fn insert_image(&self, i: NewImage) -> Result<i64> {
    let now = encode_dt(Utc::now());
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO site_image
             (site_id, image_url, thumbnail_url, title_en, title_ga, caption_en,
              caption_ga, photographer, photo_date, is_primary, display_order,
              width_px, height_px, is_public, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
          rusqlite::params![
            i.site_id,
            i.image_url,
            i.thumbnail_url,
            i.title_en,
            i.title_ga,
            i.caption_en,
            i.caption_ga,
            i.photographer,
            i.photo_date.map(encode_date),
            i.is_primary,
            i.display_order,
            i.width_px,
            i.height_px,
            i.is_public,
            now,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  pub async fn insert_source(&self, s: NewSource) -> Result<i64> {
    let now = encode_dt(Utc::now());
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO site_source
             (site_id, source_type, title, author, publication_year, publisher, url,
              isbn, pages, notes, reliability_score, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            s.site_id,
            s.source_type.as_str(),
            s.title,
            s.author,
            s.publication_year,
            s.publisher,
            s.url,
            s.isbn,
            s.pages,
            s.notes,
            s.reliability_score,
            now,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(id)
  }

  /// Run a batch of SQL statements, e.g. an exported catalog dump.
  pub async fn execute_script(&self, sql: impl Into<String>) -> Result<()> {
    let sql = sql.into();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
