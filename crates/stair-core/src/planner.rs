//! The spatial query planner.
//!
//! Request parameters arrive as loosely-typed strings; the planner validates
//! them and produces a [`SiteQuery`], a fully bounded description of what the
//! store must fetch. Every query carries a visibility rule (approved and not
//! deleted, applied by the store unconditionally), a spatial or attribute
//! predicate, an ordering, a [`Window`] and a [`Projection`].

use std::str::FromStr;

use serde::Deserialize;

use crate::{
  pager::Window,
  site::SiteType,
  Error, Result,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Latitude range accepted by proximity searches (the island of Ireland).
pub const LAT_RANGE: (f64, f64) = (51.0, 56.0);
/// Longitude range accepted by proximity searches.
pub const LON_RANGE: (f64, f64) = (-11.0, -5.0);
/// Search radius bounds, in kilometres.
pub const RADIUS_RANGE_KM: (f64, f64) = (0.1, 100.0);
pub const DEFAULT_RADIUS_KM: f64 = 10.0;
/// Proximity result bounds.
pub const LIMIT_RANGE: (usize, usize) = (1, 100);
pub const DEFAULT_LIMIT: usize = 50;

/// Planar degrees to kilometres. A flat approximation with no latitude
/// correction; east-west distances are overstated at Irish latitudes.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Characters of each description kept by the list-shaped projections.
pub const LIST_DESCRIPTION_CHARS: usize = 200;

// ─── Geometry primitives ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
  pub lon: f64,
  pub lat: f64,
}

/// Planar distance between two points in degrees, scaled to kilometres.
pub fn planar_distance_km(a: Point, b: Point) -> f64 {
  (a.lon - b.lon).hypot(a.lat - b.lat) * KM_PER_DEGREE
}

/// An axis-aligned bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
  pub min_lon: f64,
  pub min_lat: f64,
  pub max_lon: f64,
  pub max_lat: f64,
}

impl BBox {
  /// Build a box, rejecting degenerate or inverted extents.
  pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
    for v in [min_lon, min_lat, max_lon, max_lat] {
      if !v.is_finite() {
        return Err(Error::validation("Bounding box coordinates must be finite numbers"));
      }
    }
    if min_lon >= max_lon {
      return Err(Error::validation("minx must be less than maxx"));
    }
    if min_lat >= max_lat {
      return Err(Error::validation("miny must be less than maxy"));
    }
    Ok(Self { min_lon, min_lat, max_lon, max_lat })
  }

  /// Boundary-inclusive containment.
  pub fn contains(&self, p: Point) -> bool {
    (self.min_lon..=self.max_lon).contains(&p.lon) && (self.min_lat..=self.max_lat).contains(&p.lat)
  }

  /// The square of half-width `radius_km` around `centre`, used as an index
  /// prefilter for proximity searches.
  pub fn around(centre: Point, radius_km: f64) -> Self {
    let d = radius_km / KM_PER_DEGREE;
    Self {
      min_lon: centre.lon - d,
      min_lat: centre.lat - d,
      max_lon: centre.lon + d,
      max_lat: centre.lat + d,
    }
  }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SpatialFilter {
  /// Within `radius_km` of `origin`; results carry their distance.
  Near { origin: Point, radius_km: f64 },
  /// Inside the box, edges included.
  Within(BBox),
}

/// Attribute predicates. Every field is optional and they combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteFilters {
  pub site_id:           Option<i64>,
  pub county:            Option<i64>,
  pub province:          Option<i64>,
  pub era:               Option<i64>,
  /// Any of these types. Empty means unrestricted.
  pub site_types:        Vec<SiteType>,
  pub significance:      Option<u8>,
  pub significance_gte:  Option<u8>,
  pub significance_lte:  Option<u8>,
  pub national_monument: Option<bool>,
  pub unesco_site:       Option<bool>,
  pub is_public_access:  Option<bool>,
  /// Case-insensitive substring over names and descriptions in both
  /// languages.
  pub search:            Option<String>,
}

// ─── Ordering ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
  NameEn,
  SignificanceLevel,
  CreatedAt,
  DateEstablished,
}

impl OrderField {
  pub fn column(self) -> &'static str {
    match self {
      Self::NameEn => "name_en",
      Self::SignificanceLevel => "significance_level",
      Self::CreatedAt => "created_at",
      Self::DateEstablished => "date_established",
    }
  }
}

impl FromStr for OrderField {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "name_en" => Ok(Self::NameEn),
      "significance_level" => Ok(Self::SignificanceLevel),
      "created_at" => Ok(Self::CreatedAt),
      "date_established" => Ok(Self::DateEstablished),
      other => Err(Error::validation(format!("Unknown ordering field: {other}"))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
  pub field:      OrderField,
  pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SiteOrder {
  /// Ascending distance from the proximity origin.
  Distance,
  Fields(Vec<OrderKey>),
}

impl Default for SiteOrder {
  /// Most significant first, then alphabetical.
  fn default() -> Self {
    Self::Fields(vec![
      OrderKey { field: OrderField::SignificanceLevel, descending: true },
      OrderKey { field: OrderField::NameEn, descending: false },
    ])
  }
}

/// Parse an `ordering` parameter such as `-significance_level,name_en`.
/// Blank input yields the default order.
pub fn parse_ordering(raw: Option<&str>) -> Result<SiteOrder> {
  let keys = raw
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      let (descending, name) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
      };
      Ok(OrderKey { field: name.parse()?, descending })
    })
    .collect::<Result<Vec<_>>>()?;

  if keys.is_empty() { Ok(SiteOrder::default()) } else { Ok(SiteOrder::Fields(keys)) }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Which read model the store materialises for each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
  /// Map marker fields plus the first image.
  Marker,
  /// Marker fields plus related names and visitor details.
  Popup,
}

/// A bounded, ordered, field-projected site query.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteQuery {
  pub spatial:           Option<SpatialFilter>,
  pub filters:           SiteFilters,
  pub order:             SiteOrder,
  pub window:            Window,
  pub projection:        Projection,
  pub description_chars: usize,
}

impl SiteQuery {
  fn new(projection: Projection) -> Self {
    Self {
      spatial: None,
      filters: SiteFilters::default(),
      order: SiteOrder::default(),
      window: Window::default(),
      projection,
      description_chars: LIST_DESCRIPTION_CHARS,
    }
  }

  pub fn with_window(mut self, window: Window) -> Self {
    self.window = window;
    self
  }
}

// ─── Raw parameters ──────────────────────────────────────────────────────────

/// Proximity parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProximityParams {
  pub lat:      Option<String>,
  pub lon:      Option<String>,
  pub distance: Option<String>,
  pub limit:    Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewportParams {
  pub minx: Option<String>,
  pub miny: Option<String>,
  pub maxx: Option<String>,
  pub maxy: Option<String>,
}

/// Site list parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
  pub county:            Option<String>,
  pub province:          Option<String>,
  pub era:               Option<String>,
  pub site_type:         Option<String>,
  #[serde(rename = "site_type__in")]
  pub site_type_in:      Option<String>,
  #[serde(rename = "significance_level")]
  pub significance:      Option<String>,
  #[serde(rename = "significance_level__gte")]
  pub significance_gte:  Option<String>,
  #[serde(rename = "significance_level__lte")]
  pub significance_lte:  Option<String>,
  pub national_monument: Option<String>,
  pub unesco_site:       Option<String>,
  pub is_public_access:  Option<String>,
  pub search:            Option<String>,
  pub ordering:          Option<String>,
}

fn required_f64(name: &str, raw: Option<&str>) -> Result<f64> {
  let raw = raw
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| Error::validation(format!("{name}: This field is required.")))?;
  optional_f64(name, Some(raw)).map(|v| v.unwrap_or_default())
}

fn optional_f64(name: &str, raw: Option<&str>) -> Result<Option<f64>> {
  match raw.map(str::trim).filter(|s| !s.is_empty()) {
    None => Ok(None),
    Some(s) => s
      .parse::<f64>()
      .ok()
      .filter(|v| v.is_finite())
      .map(Some)
      .ok_or_else(|| Error::validation(format!("{name}: A valid number is required."))),
  }
}

fn optional_int<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>> {
  match raw.map(str::trim).filter(|s| !s.is_empty()) {
    None => Ok(None),
    Some(s) => s
      .parse::<T>()
      .map(Some)
      .map_err(|_| Error::validation(format!("{name}: A valid integer is required."))),
  }
}

fn optional_bool(name: &str, raw: Option<&str>) -> Result<Option<bool>> {
  match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
    None | Some("") => Ok(None),
    Some("true" | "1" | "yes") => Ok(Some(true)),
    Some("false" | "0" | "no") => Ok(Some(false)),
    Some(_) => Err(Error::validation(format!("{name}: Must be a valid boolean."))),
  }
}

fn in_range<T: PartialOrd + std::fmt::Display>(name: &str, v: T, (lo, hi): (T, T)) -> Result<T> {
  if v < lo || v > hi {
    return Err(Error::validation(format!("{name}: Must be between {lo} and {hi}.")));
  }
  Ok(v)
}

fn parse_site_type(raw: &str) -> Result<SiteType> {
  SiteType::parse(raw.trim())
    .ok_or_else(|| Error::validation(format!("site_type: \"{}\" is not a valid choice.", raw.trim())))
}

fn significance(name: &str, raw: Option<&str>) -> Result<Option<u8>> {
  optional_int::<u8>(name, raw)?.map(|v| in_range(name, v, (1, 4))).transpose()
}

// ─── Planning ────────────────────────────────────────────────────────────────

/// Plan a proximity search: ordered by distance, truncated to `limit`.
pub fn plan_proximity(params: &ProximityParams) -> Result<SiteQuery> {
  let lat = in_range("lat", required_f64("lat", params.lat.as_deref())?, LAT_RANGE)?;
  let lon = in_range("lon", required_f64("lon", params.lon.as_deref())?, LON_RANGE)?;
  let radius_km = optional_f64("distance", params.distance.as_deref())?.unwrap_or(DEFAULT_RADIUS_KM);
  let radius_km = in_range("distance", radius_km, RADIUS_RANGE_KM)?;
  let limit = optional_int::<usize>("limit", params.limit.as_deref())?.unwrap_or(DEFAULT_LIMIT);
  let limit = in_range("limit", limit, LIMIT_RANGE)?;

  let mut q = SiteQuery::new(Projection::Popup);
  q.spatial = Some(SpatialFilter::Near { origin: Point { lon, lat }, radius_km });
  q.order = SiteOrder::Distance;
  q.window = Window::first(limit);
  Ok(q)
}

/// Plan a viewport search. The caller supplies the page window.
pub fn plan_viewport(params: &ViewportParams) -> Result<SiteQuery> {
  let bbox = BBox::new(
    required_f64("minx", params.minx.as_deref())?,
    required_f64("miny", params.miny.as_deref())?,
    required_f64("maxx", params.maxx.as_deref())?,
    required_f64("maxy", params.maxy.as_deref())?,
  )?;
  let mut q = SiteQuery::new(Projection::Marker);
  q.spatial = Some(SpatialFilter::Within(bbox));
  Ok(q)
}

pub fn plan_by_era(era_id: i64) -> SiteQuery {
  let mut q = SiteQuery::new(Projection::Popup);
  q.filters.era = Some(era_id);
  q
}

pub fn plan_by_county(county_id: i64) -> SiteQuery {
  let mut q = SiteQuery::new(Projection::Popup);
  q.filters.county = Some(county_id);
  q
}

/// A single site in the popup projection.
pub fn plan_popup(site_id: i64) -> SiteQuery {
  let mut q = SiteQuery::new(Projection::Popup);
  q.filters.site_id = Some(site_id);
  q.window = Window::first(1);
  q
}

/// Plan the filtered, ordered site list.
pub fn plan_list(params: &ListParams) -> Result<SiteQuery> {
  let mut site_types = Vec::new();
  if let Some(raw) = params.site_type.as_deref().filter(|s| !s.trim().is_empty()) {
    site_types.push(parse_site_type(raw)?);
  }
  if let Some(raw) = params.site_type_in.as_deref() {
    for part in raw.split(',').filter(|s| !s.trim().is_empty()) {
      let t = parse_site_type(part)?;
      if !site_types.contains(&t) {
        site_types.push(t);
      }
    }
  }

  let filters = SiteFilters {
    site_id: None,
    county: optional_int("county", params.county.as_deref())?,
    province: optional_int("province", params.province.as_deref())?,
    era: optional_int("era", params.era.as_deref())?,
    site_types,
    significance: significance("significance_level", params.significance.as_deref())?,
    significance_gte: significance("significance_level__gte", params.significance_gte.as_deref())?,
    significance_lte: significance("significance_level__lte", params.significance_lte.as_deref())?,
    national_monument: optional_bool("national_monument", params.national_monument.as_deref())?,
    unesco_site: optional_bool("unesco_site", params.unesco_site.as_deref())?,
    is_public_access: optional_bool("is_public_access", params.is_public_access.as_deref())?,
    search: params
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_owned),
  };

  let mut q = SiteQuery::new(Projection::Marker);
  q.filters = filters;
  q.order = parse_ordering(params.ordering.as_deref())?;
  Ok(q)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn prox(lat: &str, lon: &str) -> ProximityParams {
    ProximityParams { lat: Some(lat.into()), lon: Some(lon.into()), ..Default::default() }
  }

  #[test]
  fn proximity_defaults() {
    let q = plan_proximity(&prox("53.35", "-6.26")).unwrap();
    assert_eq!(q.order, SiteOrder::Distance);
    assert_eq!(q.window, Window::first(DEFAULT_LIMIT));
    assert_eq!(q.projection, Projection::Popup);
    match q.spatial {
      Some(SpatialFilter::Near { radius_km, origin }) => {
        assert_eq!(radius_km, DEFAULT_RADIUS_KM);
        assert_eq!(origin, Point { lon: -6.26, lat: 53.35 });
      }
      other => panic!("unexpected spatial filter: {other:?}"),
    }
  }

  #[test]
  fn proximity_rejects_points_outside_ireland() {
    assert!(matches!(plan_proximity(&prox("48.85", "-6.0")), Err(Error::Validation(_))));
    assert!(matches!(plan_proximity(&prox("53.0", "2.35")), Err(Error::Validation(_))));
    assert!(matches!(plan_proximity(&prox("", "-6.0")), Err(Error::Validation(_))));
    assert!(matches!(plan_proximity(&prox("north", "-6.0")), Err(Error::Validation(_))));
  }

  #[test]
  fn proximity_bounds_radius_and_limit() {
    let mut p = prox("53.0", "-7.0");
    p.distance = Some("0.05".into());
    assert!(plan_proximity(&p).is_err());
    p.distance = Some("100".into());
    p.limit = Some("101".into());
    assert!(plan_proximity(&p).is_err());
    p.limit = Some("0".into());
    assert!(plan_proximity(&p).is_err());
    p.limit = Some("1".into());
    assert_eq!(plan_proximity(&p).unwrap().window.limit, 1);
  }

  #[test]
  fn viewport_requires_ordered_extents() {
    let vp = |a: &str, b: &str, c: &str, d: &str| ViewportParams {
      minx: Some(a.into()),
      miny: Some(b.into()),
      maxx: Some(c.into()),
      maxy: Some(d.into()),
    };
    assert!(plan_viewport(&vp("-9", "52", "-8", "53")).is_ok());
    assert!(matches!(plan_viewport(&vp("-8", "52", "-9", "53")), Err(Error::Validation(_))));
    assert!(matches!(plan_viewport(&vp("-9", "53", "-8", "53")), Err(Error::Validation(_))));
    assert!(plan_viewport(&ViewportParams::default()).is_err());
  }

  #[test]
  fn bbox_containment_is_inclusive() {
    let b = BBox::new(-9.0, 52.0, -8.0, 53.0).unwrap();
    assert!(b.contains(Point { lon: -9.0, lat: 52.0 }));
    assert!(b.contains(Point { lon: -8.0, lat: 53.0 }));
    assert!(b.contains(Point { lon: -8.5, lat: 52.5 }));
    assert!(!b.contains(Point { lon: -7.0, lat: 52.5 }));
  }

  #[test]
  fn planar_distance_uses_flat_conversion() {
    let d = planar_distance_km(Point { lon: -7.0, lat: 53.0 }, Point { lon: -7.0, lat: 54.0 });
    assert!((d - 111.0).abs() < 1e-9);
  }

  #[test]
  fn ordering_parses_and_rejects_unknown_fields() {
    assert_eq!(parse_ordering(None).unwrap(), SiteOrder::default());
    assert_eq!(
      parse_ordering(Some("-created_at, name_en")).unwrap(),
      SiteOrder::Fields(vec![
        OrderKey { field: OrderField::CreatedAt, descending: true },
        OrderKey { field: OrderField::NameEn, descending: false },
      ])
    );
    assert!(matches!(parse_ordering(Some("location")), Err(Error::Validation(_))));
  }

  #[test]
  fn list_collects_filters() {
    let params = ListParams {
      site_type: Some("castle".into()),
      site_type_in: Some("castle,holy_well".into()),
      significance_gte: Some("3".into()),
      national_monument: Some("true".into()),
      search: Some("  cashel ".into()),
      ..Default::default()
    };
    let q = plan_list(&params).unwrap();
    assert_eq!(q.filters.site_types, vec![SiteType::Castle, SiteType::HolyWell]);
    assert_eq!(q.filters.significance_gte, Some(3));
    assert_eq!(q.filters.national_monument, Some(true));
    assert_eq!(q.filters.search.as_deref(), Some("cashel"));
    assert_eq!(q.projection, Projection::Marker);
  }

  #[test]
  fn list_rejects_bad_choices() {
    let bad_type = ListParams { site_type: Some("spaceport".into()), ..Default::default() };
    assert!(plan_list(&bad_type).is_err());
    let bad_level = ListParams { significance: Some("7".into()), ..Default::default() };
    assert!(plan_list(&bad_level).is_err());
    let bad_flag = ListParams { unesco_site: Some("maybe".into()), ..Default::default() };
    assert!(plan_list(&bad_flag).is_err());
  }

  #[test]
  fn filtered_searches_use_popup_projection() {
    assert_eq!(plan_by_era(3).filters.era, Some(3));
    assert_eq!(plan_by_county(7).filters.county, Some(7));
    assert_eq!(plan_by_county(7).projection, Projection::Popup);
    assert_eq!(plan_popup(42).window, Window::first(1));
  }
}
