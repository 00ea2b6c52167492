//! Spatial SQL functions and the per-call statement deadline.
//!
//! Polygons are stored as GeoJSON text. The functions registered here let a
//! single SQL statement simplify, coerce and measure them, so the
//! application never holds decoded boundary geometry.

use std::time::{Duration, Instant};

use geo::{CoordsIter, Geometry, MultiPolygon, SimplifyVwPreserve};
use rusqlite::functions::{Context, FunctionFlags};
use stair_core::planner::KM_PER_DEGREE;

use crate::{Error, Result};

/// VM instructions between deadline checks.
const PROGRESS_PERIOD: i32 = 100;

// ─── Registration ────────────────────────────────────────────────────────────

pub fn register(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

  conn.create_scalar_function("st_distance_km", 4, flags, |ctx| {
    let lon1: f64 = ctx.get(0)?;
    let lat1: f64 = ctx.get(1)?;
    let lon2: f64 = ctx.get(2)?;
    let lat2: f64 = ctx.get(3)?;
    Ok((lon1 - lon2).hypot(lat1 - lat2) * KM_PER_DEGREE)
  })?;

  conn.create_scalar_function("st_simplify_preserve_topology", 2, flags, |ctx| {
    let tolerance: f64 = ctx.get(1)?;
    map_geometry(ctx, |g| simplify(g, tolerance))
  })?;

  conn.create_scalar_function("st_multi", 1, flags, |ctx| map_geometry(ctx, force_multi))?;

  conn.create_scalar_function("st_npoints", 1, flags, |ctx| {
    let Some(text) = ctx.get::<Option<String>>(0)? else {
      return Ok(None);
    };
    let g = parse(&text).map_err(user_error)?;
    Ok(Some(g.coords_count() as i64))
  })?;

  Ok(())
}

fn map_geometry(
  ctx: &Context<'_>,
  f: impl FnOnce(Geometry<f64>) -> Geometry<f64>,
) -> rusqlite::Result<Option<String>> {
  let Some(text) = ctx.get::<Option<String>>(0)? else {
    return Ok(None);
  };
  let g = parse(&text).map_err(user_error)?;
  render(&f(g)).map(Some).map_err(user_error)
}

fn user_error(err: Error) -> rusqlite::Error { rusqlite::Error::UserFunctionError(Box::new(err)) }

// ─── Geometry helpers ────────────────────────────────────────────────────────

fn parse(text: &str) -> Result<Geometry<f64>> {
  let geometry: geojson::Geometry = text.parse()?;
  Ok(Geometry::<f64>::try_from(geometry)?)
}

fn render(g: &Geometry<f64>) -> Result<String> {
  let geometry = geojson::Geometry::new(geojson::Value::from(g));
  Ok(serde_json::to_string(&geometry)?)
}

/// Topology-preserving simplification of polygonal geometry. `tolerance` is
/// a distance in degrees; the Visvalingam-Whyatt area threshold is its
/// square. Other geometry types pass through unchanged.
fn simplify(g: Geometry<f64>, tolerance: f64) -> Geometry<f64> {
  if tolerance <= 0.0 {
    return g;
  }
  let epsilon = tolerance * tolerance;
  match g {
    Geometry::Polygon(p) => Geometry::Polygon(p.simplify_vw_preserve(&epsilon)),
    Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp.simplify_vw_preserve(&epsilon)),
    Geometry::LineString(ls) => Geometry::LineString(ls.simplify_vw_preserve(&epsilon)),
    Geometry::MultiLineString(mls) => {
      Geometry::MultiLineString(mls.simplify_vw_preserve(&epsilon))
    }
    other => other,
  }
}

/// Promote a single polygon to a one-part multipolygon.
fn force_multi(g: Geometry<f64>) -> Geometry<f64> {
  match g {
    Geometry::Polygon(p) => Geometry::MultiPolygon(MultiPolygon::new(vec![p])),
    other => other,
  }
}

// ─── Deadline ────────────────────────────────────────────────────────────────

/// Run `f` with a progress handler that interrupts any statement still
/// executing once `timeout` has elapsed.
pub fn with_deadline<T>(
  conn: &mut rusqlite::Connection,
  timeout: Duration,
  f: impl FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<T>,
) -> tokio_rusqlite::Result<T> {
  let deadline = Instant::now() + timeout;
  conn.progress_handler(PROGRESS_PERIOD, Some(move || Instant::now() >= deadline));
  let out = f(conn);
  conn.progress_handler(PROGRESS_PERIOD, None::<fn() -> bool>);
  out
}
