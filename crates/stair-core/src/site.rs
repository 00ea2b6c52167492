//! Historical sites and their child records.
//!
//! Sites are owned by the catalog; only approved, non-deleted rows are ever
//! visible to public queries. The types here are read models: each list or
//! detail query materialises exactly the fields its projection needs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Classification ──────────────────────────────────────────────────────────

/// Category of a historical site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteType {
  Castle,
  Monastery,
  Fort,
  BurialSite,
  StoneMonument,
  HolyWell,
  Battlefield,
  HistoricHouse,
  ArchaeologicalSite,
  Church,
  Tower,
  Bridge,
  Other,
}

impl SiteType {
  pub const ALL: [SiteType; 13] = [
    Self::Castle,
    Self::Monastery,
    Self::Fort,
    Self::BurialSite,
    Self::StoneMonument,
    Self::HolyWell,
    Self::Battlefield,
    Self::HistoricHouse,
    Self::ArchaeologicalSite,
    Self::Church,
    Self::Tower,
    Self::Bridge,
    Self::Other,
  ];

  /// The discriminant stored in the database and used in query strings.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Castle => "castle",
      Self::Monastery => "monastery",
      Self::Fort => "fort",
      Self::BurialSite => "burial_site",
      Self::StoneMonument => "stone_monument",
      Self::HolyWell => "holy_well",
      Self::Battlefield => "battlefield",
      Self::HistoricHouse => "historic_house",
      Self::ArchaeologicalSite => "archaeological_site",
      Self::Church => "church",
      Self::Tower => "tower",
      Self::Bridge => "bridge",
      Self::Other => "other",
    }
  }

  /// Human-readable label shown in popups.
  pub fn label(self) -> &'static str {
    match self {
      Self::Castle => "Castle",
      Self::Monastery => "Monastery/Abbey",
      Self::Fort => "Fort/Ringfort",
      Self::BurialSite => "Burial Site/Tomb",
      Self::StoneMonument => "Stone Monument",
      Self::HolyWell => "Holy Well",
      Self::Battlefield => "Battlefield",
      Self::HistoricHouse => "Historic House",
      Self::ArchaeologicalSite => "Archaeological Site",
      Self::Church => "Church/Chapel",
      Self::Tower => "Tower/Round Tower",
      Self::Bridge => "Historic Bridge",
      Self::Other => "Other",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|t| t.as_str() == s)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreservationStatus {
  Excellent,
  Good,
  Fair,
  Poor,
  Ruins,
  Archaeological,
}

impl PreservationStatus {
  pub const ALL: [PreservationStatus; 6] = [
    Self::Excellent,
    Self::Good,
    Self::Fair,
    Self::Poor,
    Self::Ruins,
    Self::Archaeological,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Excellent => "excellent",
      Self::Good => "good",
      Self::Fair => "fair",
      Self::Poor => "poor",
      Self::Ruins => "ruins",
      Self::Archaeological => "archaeological",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Archaeological => "Archaeological Only",
      Self::Excellent => "Excellent",
      Self::Good => "Good",
      Self::Fair => "Fair",
      Self::Poor => "Poor",
      Self::Ruins => "Ruins",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|p| p.as_str() == s)
  }
}

/// Moderation state set by the (external) admin workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

impl ApprovalStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Rejected => "rejected",
    }
  }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// A WGS84 point with optional elevation (the Z ordinate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub longitude: f64,
  pub latitude:  f64,
  pub elevation: Option<f64>,
}

impl Location {
  /// GeoJSON point geometry; three-dimensional when elevation is known.
  pub fn to_geometry(&self) -> geojson::Geometry {
    let mut position = vec![self.longitude, self.latitude];
    if let Some(z) = self.elevation {
      position.push(z);
    }
    geojson::Geometry::new(geojson::Value::Point(position))
  }
}

// ─── Images ──────────────────────────────────────────────────────────────────

/// The single image prefetched for each site in a list result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageThumb {
  pub id:            i64,
  pub image_url:     String,
  pub thumbnail_url: String,
  pub is_primary:    bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteImage {
  pub id:            i64,
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
}

impl SiteImage {
  pub fn thumb(&self) -> ImageThumb {
    ImageThumb {
      id:            self.id,
      image_url:     self.image_url.clone(),
      thumbnail_url: self.thumbnail_url.clone(),
      is_primary:    self.is_primary,
    }
  }
}

// ─── Sources ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
  Book,
  Journal,
  Website,
  Archive,
  OralHistory,
  GovernmentRecord,
}

impl SourceType {
  pub const ALL: [SourceType; 6] = [
    Self::Book,
    Self::Journal,
    Self::Website,
    Self::Archive,
    Self::OralHistory,
    Self::GovernmentRecord,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Book => "book",
      Self::Journal => "journal",
      Self::Website => "website",
      Self::Archive => "archive",
      Self::OralHistory => "oral_history",
      Self::GovernmentRecord => "government_record",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Book => "Book",
      Self::Journal => "Journal Article",
      Self::Website => "Website",
      Self::Archive => "Archive Document",
      Self::OralHistory => "Oral History",
      Self::GovernmentRecord => "Government Record",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|t| t.as_str() == s)
  }
}

/// An academic or archival reference for a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSource {
  pub id:                i64,
  pub source_type:       SourceType,
  pub title:             String,
  pub author:            String,
  pub publication_year:  Option<i32>,
  pub publisher:         String,
  pub url:               String,
  pub isbn:              String,
  pub pages:             String,
  pub notes:             String,
  /// 1 = questionable, 5 = highly reliable.
  pub reliability_score: u8,
}

impl SiteSource {
  /// `Author. (Year). Title. Publisher`, omitting absent parts.
  pub fn citation(&self) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);
    if !self.author.is_empty() {
      parts.push(self.author.clone());
    }
    if let Some(year) = self.publication_year {
      parts.push(format!("({year})"));
    }
    parts.push(self.title.clone());
    if !self.publisher.is_empty() {
      parts.push(self.publisher.clone());
    }
    parts.join(". ")
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// Extra columns fetched for the popup projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupExtras {
  pub county_name:      Option<String>,
  pub era_name:         Option<String>,
  pub era_color:        Option<String>,
  pub date_established: Option<NaiveDate>,
  pub is_public_access: bool,
  pub website_url:      String,
}

/// One row of a list-shaped site query.
///
/// Descriptions are already truncated by the store. `first_image` is the
/// only image the serializers may use; it is never re-queried per site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSummary {
  pub id:                 i64,
  pub name_en:            String,
  pub name_ga:            String,
  pub site_type:          SiteType,
  pub significance_level: u8,
  pub national_monument:  bool,
  pub unesco_site:        bool,
  pub description_en:     String,
  pub description_ga:     String,
  pub location:           Location,
  pub county_id:          Option<i64>,
  pub era_id:             Option<i64>,
  pub first_image:        Option<ImageThumb>,
  /// Present only for the popup projection.
  pub popup:              Option<PopupExtras>,
  /// Present only for proximity searches.
  pub distance_km:        Option<f64>,
}

/// The full record for a single-site fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDetail {
  pub id:                  i64,
  pub name_en:             String,
  pub name_ga:             String,
  pub description_en:      String,
  pub description_ga:      String,
  pub location:            Location,
  pub elevation_meters:    Option<f64>,
  pub county_id:           Option<i64>,
  pub county_name:         Option<String>,
  pub county_name_ga:      Option<String>,
  pub province_name:       Option<String>,
  pub era_id:              Option<i64>,
  pub era_name:            Option<String>,
  pub era_name_ga:         Option<String>,
  pub era_color:           Option<String>,
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
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
  pub images:              Vec<SiteImage>,
  pub sources:             Vec<SiteSource>,
}

impl SiteDetail {
  /// The primary image if one is flagged, else the first by display order.
  pub fn primary_image(&self) -> Option<&SiteImage> {
    self
      .images
      .iter()
      .find(|i| i.is_primary)
      .or_else(|| self.images.first())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn site_type_round_trips_through_discriminant() {
    for t in SiteType::ALL {
      assert_eq!(SiteType::parse(t.as_str()), Some(t));
    }
    assert_eq!(SiteType::parse("spaceport"), None);
  }

  #[test]
  fn location_with_elevation_is_three_dimensional() {
    let loc = Location { longitude: -8.5, latitude: 52.5, elevation: Some(40.0) };
    match loc.to_geometry().value {
      geojson::Value::Point(p) => assert_eq!(p, vec![-8.5, 52.5, 40.0]),
      other => panic!("expected point, got {other:?}"),
    }
  }

  fn source(author: &str, year: Option<i32>, publisher: &str) -> SiteSource {
    SiteSource {
      id:                1,
      source_type:       SourceType::Book,
      title:             "The Rock of Cashel".into(),
      author:            author.into(),
      publication_year:  year,
      publisher:         publisher.into(),
      url:               String::new(),
      isbn:              String::new(),
      pages:             String::new(),
      notes:             String::new(),
      reliability_score: 4,
    }
  }

  #[test]
  fn citation_includes_every_present_part() {
    let s = source("Ó Riordáin", Some(1979), "Dolmen Press");
    assert_eq!(s.citation(), "Ó Riordáin. (1979). The Rock of Cashel. Dolmen Press");
  }

  #[test]
  fn citation_skips_missing_parts() {
    assert_eq!(source("", None, "").citation(), "The Rock of Cashel");
  }
}
