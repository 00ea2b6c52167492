//! GeoJSON response shapes for sites and boundaries.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::value::RawValue;
use stair_core::{
  boundary::BoundaryDetail,
  pager::Page,
  site::{ImageThumb, SiteDetail, SiteSummary, SiteType},
};

use crate::paging::RequestUrl;

#[derive(Debug, Serialize)]
pub struct Feature<G, P> {
  #[serde(rename = "type")]
  kind:       &'static str,
  pub id:         i64,
  pub geometry:   G,
  pub properties: P,
}

impl<G, P> Feature<G, P> {
  pub fn new(id: i64, geometry: G, properties: P) -> Self {
    Self { kind: "Feature", id, geometry, properties }
  }
}

pub type SiteFeature = Feature<geojson::Geometry, SiteProperties>;

#[derive(Debug, Serialize)]
pub struct FeatureCollection<F> {
  #[serde(rename = "type")]
  kind:         &'static str,
  pub features: Vec<F>,
}

impl<F> FeatureCollection<F> {
  pub fn new(features: Vec<F>) -> Self { Self { kind: "FeatureCollection", features } }
}

/// A FeatureCollection carrying the page envelope alongside `features`.
#[derive(Debug, Serialize)]
pub struct PagedFeatureCollection<F> {
  #[serde(rename = "type")]
  kind:         &'static str,
  pub count:    usize,
  pub next:     Option<String>,
  pub previous: Option<String>,
  pub features: Vec<F>,
}

impl<F> PagedFeatureCollection<F> {
  pub fn new(page: Page<F>, url: &RequestUrl) -> Self {
    let next = page.has_next().then(|| url.page(page.number + 1));
    let previous = page.has_previous().then(|| url.page(page.number - 1));
    Self { kind: "FeatureCollection", count: page.count, next, previous, features: page.results }
  }

  pub fn empty() -> Self {
    Self { kind: "FeatureCollection", count: 0, next: None, previous: None, features: Vec::new() }
  }
}

// ─── Sites ───────────────────────────────────────────────────────────────────

/// Marker fields, plus popup fields when the query asked for them.
#[derive(Debug, Serialize)]
pub struct SiteProperties {
  pub id:                 i64,
  pub name_en:            String,
  pub name_ga:            String,
  pub site_type:          SiteType,
  pub significance_level: u8,
  pub national_monument:  bool,
  pub unesco_site:        bool,
  pub description_en:     String,
  pub description_ga:     String,
  pub county:             Option<i64>,
  pub era:                Option<i64>,
  pub first_image:        Option<ImageThumb>,
  #[serde(flatten)]
  pub popup:              Option<PopupProperties>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub distance_km:        Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PopupProperties {
  pub site_type_display: &'static str,
  pub county_name:       Option<String>,
  pub era_name:          Option<String>,
  pub era_color:         Option<String>,
  pub date_established:  Option<NaiveDate>,
  pub is_public_access:  bool,
  pub website_url:       String,
  pub primary_image_url: Option<String>,
}

impl From<SiteSummary> for SiteFeature {
  fn from(s: SiteSummary) -> Self {
    let popup = s.popup.map(|p| PopupProperties {
      site_type_display: s.site_type.label(),
      county_name:       p.county_name,
      era_name:          p.era_name,
      era_color:         p.era_color,
      date_established:  p.date_established,
      is_public_access:  p.is_public_access,
      website_url:       p.website_url,
      primary_image_url: s.first_image.as_ref().map(|i| i.image_url.clone()),
    });
    Feature::new(s.id, s.location.to_geometry(), SiteProperties {
      id: s.id,
      name_en: s.name_en,
      name_ga: s.name_ga,
      site_type: s.site_type,
      significance_level: s.significance_level,
      national_monument: s.national_monument,
      unesco_site: s.unesco_site,
      description_en: s.description_en,
      description_ga: s.description_ga,
      county: s.county_id,
      era: s.era_id,
      first_image: s.first_image,
      popup,
      distance_km: s.distance_km,
    })
  }
}

/// Full record, with display labels and the chosen primary image.
#[derive(Debug, Serialize)]
pub struct SiteDetailProperties {
  #[serde(flatten)]
  pub detail:                      SiteDetail,
  pub coordinates:                 [f64; 2],
  pub site_type_display:           &'static str,
  pub preservation_status_display: Option<&'static str>,
  pub primary_image:               Option<ImageThumb>,
}

pub fn site_detail_feature(detail: SiteDetail) -> Feature<geojson::Geometry, SiteDetailProperties> {
  let geometry = detail.location.to_geometry();
  let primary_image = detail.primary_image().map(|i| i.thumb());
  Feature::new(detail.id, geometry, SiteDetailProperties {
    coordinates: [detail.location.longitude, detail.location.latitude],
    site_type_display: detail.site_type.label(),
    preservation_status_display: detail.preservation_status.map(|p| p.label()),
    primary_image,
    detail,
  })
}

// ─── Boundaries ──────────────────────────────────────────────────────────────

pub type BoundaryFeature = Feature<Box<RawValue>, BoundaryDetail>;

/// A single boundary with its stored geometry passed through untouched.
pub fn boundary_feature(detail: BoundaryDetail) -> BoundaryFeature {
  Feature::new(detail.id, detail.geometry.clone(), detail)
}

#[cfg(test)]
mod tests {
  use stair_core::site::{Location, PopupExtras};

  use super::*;

  fn summary() -> SiteSummary {
    SiteSummary {
      id:                 42,
      name_en:            "Rock of Cashel".into(),
      name_ga:            "Carraig Phádraig".into(),
      site_type:          SiteType::Castle,
      significance_level: 4,
      national_monument:  true,
      unesco_site:        false,
      description_en:     String::new(),
      description_ga:     String::new(),
      location:           Location { longitude: -7.88, latitude: 52.52, elevation: None },
      county_id:          Some(1),
      era_id:             None,
      first_image:        Some(ImageThumb {
        id:            3,
        image_url:     "https://img.example/cashel.jpg".into(),
        thumbnail_url: String::new(),
        is_primary:    true,
      }),
      popup:              None,
      distance_km:        None,
    }
  }

  #[test]
  fn marker_feature_omits_popup_fields() {
    let v = serde_json::to_value(SiteFeature::from(summary())).unwrap();
    assert_eq!(v["type"], "Feature");
    assert_eq!(v["id"], 42);
    assert_eq!(v["geometry"]["type"], "Point");
    assert_eq!(v["properties"]["site_type"], "castle");
    assert!(v["properties"].get("county_name").is_none());
    assert!(v["properties"].get("distance_km").is_none());
  }

  #[test]
  fn popup_feature_flattens_extras() {
    let mut s = summary();
    s.popup = Some(PopupExtras {
      county_name:      Some("Tipperary".into()),
      era_name:         None,
      era_color:        None,
      date_established: None,
      is_public_access: true,
      website_url:      String::new(),
    });
    s.distance_km = Some(1.5);
    let v = serde_json::to_value(SiteFeature::from(s)).unwrap();
    assert_eq!(v["properties"]["county_name"], "Tipperary");
    assert_eq!(v["properties"]["site_type_display"], "Castle");
    assert_eq!(v["properties"]["primary_image_url"], "https://img.example/cashel.jpg");
    assert_eq!(v["properties"]["distance_km"], 1.5);
  }
}
