//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with microsecond precision so
//! that lexical and chronological order agree. Calendar dates are stored as
//! `YYYY-MM-DD`. Enum discriminants are stored as their snake_case names.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound as _, Utc};
use stair_core::{
  bucket::{BucketListItem, BucketSite, BucketStatus, PhotoRef},
  era::Era,
  planner::Projection,
  site::{
    ImageThumb, Location, PopupExtras, PreservationStatus, SiteDetail, SiteImage,
    SiteSource, SiteSummary, SiteType, SourceType,
  },
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().filter(|s| !s.is_empty()).map(decode_date).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

fn unknown(kind: &'static str, value: &str) -> Error {
  Error::UnknownValue { kind, value: value.to_owned() }
}

pub fn decode_site_type(s: &str) -> Result<SiteType> {
  SiteType::parse(s).ok_or_else(|| unknown("site_type", s))
}

pub fn decode_preservation(s: Option<String>) -> Result<Option<PreservationStatus>> {
  match s.as_deref() {
    None | Some("") => Ok(None),
    Some(v) => PreservationStatus::parse(v).map(Some).ok_or_else(|| unknown("preservation_status", v)),
  }
}

pub fn decode_source_type(s: &str) -> Result<SourceType> {
  SourceType::parse(s).ok_or_else(|| unknown("source_type", s))
}

pub fn decode_bucket_status(s: &str) -> Result<BucketStatus> {
  s.parse().map_err(|_| unknown("status", s))
}

fn decode_significance(level: i64) -> Result<u8> {
  u8::try_from(level)
    .ok()
    .filter(|l| (1..=4).contains(l))
    .ok_or_else(|| unknown("significance_level", &level.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns selected by every list-shaped site query, in select order.
///
/// The popup columns are null for the marker projection. The first image is
/// fetched separately, once per page.
pub struct RawSiteSummary {
  pub id:                 i64,
  pub name_en:            String,
  pub name_ga:            String,
  pub site_type:          String,
  pub significance_level: i64,
  pub national_monument:  bool,
  pub unesco_site:        bool,
  pub description_en:     String,
  pub description_ga:     String,
  pub longitude:          f64,
  pub latitude:           f64,
  pub elevation:          Option<f64>,
  pub county_id:          Option<i64>,
  pub era_id:             Option<i64>,
  pub county_name:        Option<String>,
  pub era_name:           Option<String>,
  pub era_color:          Option<String>,
  pub date_established:   Option<String>,
  pub is_public_access:   Option<bool>,
  pub website_url:        Option<String>,
  pub distance_km:        Option<f64>,
}

impl RawSiteSummary {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      name_en:            row.get(1)?,
      name_ga:            row.get(2)?,
      site_type:          row.get(3)?,
      significance_level: row.get(4)?,
      national_monument:  row.get(5)?,
      unesco_site:        row.get(6)?,
      description_en:     row.get(7)?,
      description_ga:     row.get(8)?,
      longitude:          row.get(9)?,
      latitude:           row.get(10)?,
      elevation:          row.get(11)?,
      county_id:          row.get(12)?,
      era_id:             row.get(13)?,
      county_name:        row.get(14)?,
      era_name:           row.get(15)?,
      era_color:          row.get(16)?,
      date_established:   row.get(17)?,
      is_public_access:   row.get(18)?,
      website_url:        row.get(19)?,
      distance_km:        row.get(20)?,
    })
  }

  pub fn into_summary(
    self,
    projection: Projection,
    first_image: Option<ImageThumb>,
  ) -> Result<SiteSummary> {
    let popup = match projection {
      Projection::Marker => None,
      Projection::Popup => Some(PopupExtras {
        county_name:      self.county_name,
        era_name:         self.era_name,
        era_color:        self.era_color,
        date_established: decode_opt_date(self.date_established)?,
        is_public_access: self.is_public_access.unwrap_or(true),
        website_url:      self.website_url.unwrap_or_default(),
      }),
    };

    Ok(SiteSummary {
      id: self.id,
      name_en: self.name_en,
      name_ga: self.name_ga,
      site_type: decode_site_type(&self.site_type)?,
      significance_level: decode_significance(self.significance_level)?,
      national_monument: self.national_monument,
      unesco_site: self.unesco_site,
      description_en: self.description_en,
      description_ga: self.description_ga,
      location: Location {
        longitude: self.longitude,
        latitude:  self.latitude,
        elevation: self.elevation,
      },
      county_id: self.county_id,
      era_id: self.era_id,
      first_image,
      popup,
      distance_km: self.distance_km,
    })
  }
}

/// A full `historical_site` row joined with county, province and era names.
pub struct RawSiteDetail {
  pub id:                  i64,
  pub name_en:             String,
  pub name_ga:             String,
  pub description_en:      String,
  pub description_ga:      String,
  pub longitude:           f64,
  pub latitude:            f64,
  pub elevation:           Option<f64>,
  pub elevation_meters:    Option<f64>,
  pub county_id:           Option<i64>,
  pub county_name:         Option<String>,
  pub county_name_ga:      Option<String>,
  pub province_name:       Option<String>,
  pub era_id:              Option<i64>,
  pub era_name:            Option<String>,
  pub era_name_ga:         Option<String>,
  pub era_color:           Option<String>,
  pub date_established:    Option<String>,
  pub date_abandoned:      Option<String>,
  pub construction_period: String,
  pub site_type:           String,
  pub significance_level:  i64,
  pub preservation_status: Option<String>,
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
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawSiteDetail {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get("id")?,
      name_en:             row.get("name_en")?,
      name_ga:             row.get("name_ga")?,
      description_en:      row.get("description_en")?,
      description_ga:      row.get("description_ga")?,
      longitude:           row.get("longitude")?,
      latitude:            row.get("latitude")?,
      elevation:           row.get("elevation")?,
      elevation_meters:    row.get("elevation_meters")?,
      county_id:           row.get("county_id")?,
      county_name:         row.get("county_name")?,
      county_name_ga:      row.get("county_name_ga")?,
      province_name:       row.get("province_name")?,
      era_id:              row.get("era_id")?,
      era_name:            row.get("era_name")?,
      era_name_ga:         row.get("era_name_ga")?,
      era_color:           row.get("era_color")?,
      date_established:    row.get("date_established")?,
      date_abandoned:      row.get("date_abandoned")?,
      construction_period: row.get("construction_period")?,
      site_type:           row.get("site_type")?,
      significance_level:  row.get("significance_level")?,
      preservation_status: row.get("preservation_status")?,
      national_monument:   row.get("national_monument")?,
      unesco_site:         row.get("unesco_site")?,
      is_public_access:    row.get("is_public_access")?,
      visitor_center:      row.get("visitor_center")?,
      admission_required:  row.get("admission_required")?,
      address:             row.get("address")?,
      eircode:             row.get("eircode")?,
      website_url:         row.get("website_url")?,
      phone_number:        row.get("phone_number")?,
      data_source:         row.get("data_source")?,
      created_at:          row.get("created_at")?,
      updated_at:          row.get("updated_at")?,
    })
  }

  pub fn into_detail(self, images: Vec<SiteImage>, sources: Vec<SiteSource>) -> Result<SiteDetail> {
    Ok(SiteDetail {
      id: self.id,
      name_en: self.name_en,
      name_ga: self.name_ga,
      description_en: self.description_en,
      description_ga: self.description_ga,
      location: Location {
        longitude: self.longitude,
        latitude:  self.latitude,
        elevation: self.elevation,
      },
      elevation_meters: self.elevation_meters,
      county_id: self.county_id,
      county_name: self.county_name,
      county_name_ga: self.county_name_ga,
      province_name: self.province_name,
      era_id: self.era_id,
      era_name: self.era_name,
      era_name_ga: self.era_name_ga,
      era_color: self.era_color,
      date_established: decode_opt_date(self.date_established)?,
      date_abandoned: decode_opt_date(self.date_abandoned)?,
      construction_period: self.construction_period,
      site_type: decode_site_type(&self.site_type)?,
      significance_level: decode_significance(self.significance_level)?,
      preservation_status: decode_preservation(self.preservation_status)?,
      national_monument: self.national_monument,
      unesco_site: self.unesco_site,
      is_public_access: self.is_public_access,
      visitor_center: self.visitor_center,
      admission_required: self.admission_required,
      address: self.address,
      eircode: self.eircode,
      website_url: self.website_url,
      phone_number: self.phone_number,
      data_source: self.data_source,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      images,
      sources,
    })
  }
}

/// Column list shared by every `site_image` read.
pub const IMAGE_COLUMNS: &str = "i.id, i.site_id, i.image_url, i.thumbnail_url, i.title_en, \
   i.title_ga, i.caption_en, i.caption_ga, i.photographer, i.photo_date, i.is_primary, \
   i.display_order, i.width_px, i.height_px";

pub struct RawImage {
  pub id:            i64,
  pub site_id:       i64,
  pub image_url:     String,
  pub thumbnail_url: String,
  pub title_en:      String,
  pub title_ga:      String,
  pub caption_en:    String,
  pub caption_ga:    String,
  pub photographer:  String,
  pub photo_date:    Option<String>,
  pub is_primary:    bool,
  pub display_order: i64,
  pub width_px:      Option<i64>,
  pub height_px:     Option<i64>,
}

impl RawImage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      site_id:       row.get(1)?,
      image_url:     row.get(2)?,
      thumbnail_url: row.get(3)?,
      title_en:      row.get(4)?,
      title_ga:      row.get(5)?,
      caption_en:    row.get(6)?,
      caption_ga:    row.get(7)?,
      photographer:  row.get(8)?,
      photo_date:    row.get(9)?,
      is_primary:    row.get(10)?,
      display_order: row.get(11)?,
      width_px:      row.get(12)?,
      height_px:     row.get(13)?,
    })
  }

  pub fn into_image(self) -> Result<SiteImage> {
    Ok(SiteImage {
      id:            self.id,
      site_id:       self.site_id,
      image_url:     self.image_url,
      thumbnail_url: self.thumbnail_url,
      title_en:      self.title_en,
      title_ga:      self.title_ga,
      caption_en:    self.caption_en,
      caption_ga:    self.caption_ga,
      photographer:  self.photographer,
      photo_date:    decode_opt_date(self.photo_date)?,
      is_primary:    self.is_primary,
      display_order: self.display_order,
      width_px:      self.width_px,
      height_px:     self.height_px,
    })
  }
}

pub struct RawSource {
  pub id:                i64,
  pub source_type:       String,
  pub title:             String,
  pub author:            String,
  pub publication_year:  Option<i32>,
  pub publisher:         String,
  pub url:               String,
  pub isbn:              String,
  pub pages:             String,
  pub notes:             String,
  pub reliability_score: i64,
}

impl RawSource {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      source_type:       row.get(1)?,
      title:             row.get(2)?,
      author:            row.get(3)?,
      publication_year:  row.get(4)?,
      publisher:         row.get(5)?,
      url:               row.get(6)?,
      isbn:              row.get(7)?,
      pages:             row.get(8)?,
      notes:             row.get(9)?,
      reliability_score: row.get(10)?,
    })
  }

  pub fn into_source(self) -> Result<SiteSource> {
    Ok(SiteSource {
      id:                self.id,
      source_type:       decode_source_type(&self.source_type)?,
      title:             self.title,
      author:            self.author,
      publication_year:  self.publication_year,
      publisher:         self.publisher,
      url:               self.url,
      isbn:              self.isbn,
      pages:             self.pages,
      notes:             self.notes,
      reliability_score: self.reliability_score.clamp(1, 5) as u8,
    })
  }
}

pub const ERA_COLUMNS: &str =
  "e.id, e.name_en, e.name_ga, e.start_year, e.end_year, e.description_en, e.description_ga, \
   e.color_hex, e.display_order";

pub fn era_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Era> {
  Ok(Era {
    id:             row.get(0)?,
    name_en:        row.get(1)?,
    name_ga:        row.get(2)?,
    start_year:     row.get(3)?,
    end_year:       row.get(4)?,
    description_en: row.get(5)?,
    description_ga: row.get(6)?,
    color_hex:      row.get(7)?,
    display_order:  row.get(8)?,
  })
}

/// Column list for bucket-list reads: the item joined with its site, county
/// and era.
pub const BUCKET_COLUMNS: &str = "b.id, b.status, b.added_at, b.visited_at, b.photo_path, \
   b.photo_hash, b.photo_media_type, b.photo_caption, b.updated_at, s.id, s.name_en, \
   s.name_ga, s.site_type, c.name_en, e.name_en, s.longitude, s.latitude, s.elevation";

pub struct RawBucketItem {
  pub id:               i64,
  pub status:           String,
  pub added_at:         String,
  pub visited_at:       Option<String>,
  pub photo_path:       Option<String>,
  pub photo_hash:       Option<String>,
  pub photo_media_type: Option<String>,
  pub photo_caption:    String,
  pub updated_at:       String,
  pub site_id:          i64,
  pub site_name_en:     String,
  pub site_name_ga:     String,
  pub site_type:        String,
  pub county_name:      Option<String>,
  pub era_name:         Option<String>,
  pub longitude:        f64,
  pub latitude:         f64,
  pub elevation:        Option<f64>,
}

impl RawBucketItem {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      status:           row.get(1)?,
      added_at:         row.get(2)?,
      visited_at:       row.get(3)?,
      photo_path:       row.get(4)?,
      photo_hash:       row.get(5)?,
      photo_media_type: row.get(6)?,
      photo_caption:    row.get(7)?,
      updated_at:       row.get(8)?,
      site_id:          row.get(9)?,
      site_name_en:     row.get(10)?,
      site_name_ga:     row.get(11)?,
      site_type:        row.get(12)?,
      county_name:      row.get(13)?,
      era_name:         row.get(14)?,
      longitude:        row.get(15)?,
      latitude:         row.get(16)?,
      elevation:        row.get(17)?,
    })
  }

  pub fn into_item(self) -> Result<BucketListItem> {
    let photo = match (self.photo_path, self.photo_hash, self.photo_media_type) {
      (Some(path), Some(content_hash), Some(media_type)) => {
        Some(PhotoRef { path, content_hash, media_type })
      }
      _ => None,
    };

    Ok(BucketListItem {
      id: self.id,
      site: BucketSite {
        id:          self.site_id,
        name_en:     self.site_name_en,
        name_ga:     self.site_name_ga,
        site_type:   decode_site_type(&self.site_type)?,
        county_name: self.county_name,
        era_name:    self.era_name,
        location:    Location {
          longitude: self.longitude,
          latitude:  self.latitude,
          elevation: self.elevation,
        },
      },
      status: decode_bucket_status(&self.status)?,
      added_at: decode_dt(&self.added_at)?,
      visited_at: self.visited_at.as_deref().map(decode_dt).transpose()?,
      photo,
      photo_caption: self.photo_caption,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn blank_preservation_is_none() {
    assert_eq!(decode_preservation(Some(String::new())).unwrap(), None);
    assert!(decode_preservation(Some("pristine".into())).is_err());
  }

  #[test]
  fn significance_out_of_range_is_rejected() {
    assert!(decode_significance(0).is_err());
    assert_eq!(decode_significance(4).unwrap(), 4);
  }
}
