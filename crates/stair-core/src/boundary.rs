//! Administrative boundary layers (provinces and counties).
//!
//! Boundary polygons are never decoded into application values on the list
//! path: the store returns a finished FeatureCollection as JSON text. The
//! types here cover the materialisation request and the geometry-free
//! summaries used by `list_simple`.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// A FeatureCollection with no features, returned when a layer cannot be
/// materialised.
pub const EMPTY_FEATURE_COLLECTION: &str = r#"{"type":"FeatureCollection","features":[]}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryLayer {
  Province,
  County,
}

impl BoundaryLayer {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Province => "province",
      Self::County => "county",
    }
  }
}

/// Parameters for [`GeoStore::materialize_boundaries`](crate::store::GeoStore::materialize_boundaries).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryQuery {
  pub layer:             BoundaryLayer,
  /// Owning province; only meaningful for the county layer.
  pub parent:            Option<i64>,
  /// Simplification tolerance in degrees.
  pub tolerance:         f64,
  /// Maximum number of characters kept from each description.
  pub description_limit: usize,
}

impl BoundaryQuery {
  pub fn provinces(tolerance: f64, description_limit: usize) -> Self {
    Self { layer: BoundaryLayer::Province, parent: None, tolerance, description_limit }
  }

  pub fn counties(parent: Option<i64>, tolerance: f64, description_limit: usize) -> Self {
    Self { layer: BoundaryLayer::County, parent, tolerance, description_limit }
  }
}

// ─── Simple listings ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceSummary {
  pub id:      i64,
  pub name_en: String,
  pub name_ga: String,
  pub code:    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountySummary {
  pub id:            i64,
  pub name_en:       String,
  pub name_ga:       String,
  pub code:          String,
  pub province:      i64,
  pub province_name: String,
}

// ─── Detail ──────────────────────────────────────────────────────────────────

/// Owning province of a county detail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceRef {
  pub id:      i64,
  pub name_en: String,
  pub code:    String,
}

/// A single province or county with its stored geometry.
///
/// `geometry` is the stored GeoJSON text, embedded without being parsed. It
/// is serialized as the Feature geometry, not as a property.
#[derive(Debug, Clone, Serialize)]
pub struct BoundaryDetail {
  pub layer:          BoundaryLayer,
  pub id:             i64,
  pub name_en:        String,
  pub name_ga:        String,
  pub code:           String,
  pub area_km2:       Option<f64>,
  pub population:     Option<i64>,
  pub description_en: String,
  pub description_ga: String,
  #[serde(skip_serializing)]
  pub geometry:       Box<RawValue>,
  /// Provinces only.
  pub county_count:   Option<i64>,
  pub site_count:     i64,
  /// Counties only.
  pub province:       Option<ProvinceRef>,
}
