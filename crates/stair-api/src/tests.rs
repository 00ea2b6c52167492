//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use stair_core::{session::SessionContext, site::SiteType, store::GeoStore};
use stair_store_sqlite::{
  SqliteStore,
  import::{NewCounty, NewImage, NewProvince, NewSite},
};
use tower::ServiceExt as _;

use super::*;

fn square(lon: f64, lat: f64, half: f64) -> geojson::Geometry {
  let ring = vec![
    vec![lon - half, lat - half],
    vec![lon + half, lat - half],
    vec![lon + half, lat + half],
    vec![lon - half, lat + half],
    vec![lon - half, lat - half],
  ];
  geojson::Geometry::new(geojson::Value::Polygon(vec![ring]))
}

struct Seeded {
  leinster: i64,
  dublin:   i64,
  /// Approved, Tipperary, at (-8.5, 52.5).
  cashel:   i64,
  /// Approved, Cork, at (-7.0, 52.5).
  fort:     i64,
  /// Approved, Dublin, at (-6.26, 53.35).
  tomb:     i64,
}

async fn seed(s: &SqliteStore) -> Seeded {
  let province = |name: &str, code: &str, lon: f64, lat: f64| NewProvince {
    name_en:        name.into(),
    name_ga:        format!("{name} (ga)"),
    code:           code.into(),
    geometry:       square(lon, lat, 1.0),
    area_km2:       None,
    population:     None,
    description_en: String::new(),
    description_ga: String::new(),
  };
  let leinster = s.insert_province(province("Leinster", "L", -6.8, 53.0)).await.unwrap();
  let munster = s.insert_province(province("Munster", "M", -8.5, 52.2)).await.unwrap();

  let county = |name: &str, code: &str, province_id: i64, lon: f64, lat: f64| NewCounty {
    name_en: name.into(),
    name_ga: format!("{name} (ga)"),
    code: code.into(),
    province_id,
    geometry: square(lon, lat, 0.3),
    area_km2: None,
    population: None,
    description_en: String::new(),
    description_ga: String::new(),
  };
  let dublin = s.insert_county(county("Dublin", "D", leinster, -6.3, 53.35)).await.unwrap();
  s.insert_county(county("Meath", "MH", leinster, -6.6, 53.6)).await.unwrap();
  let cork = s.insert_county(county("Cork", "CO", munster, -8.6, 51.9)).await.unwrap();
  let tipperary = s.insert_county(county("Tipperary", "T", munster, -7.9, 52.6)).await.unwrap();

  let mut site = NewSite::new("Rock of Cashel", SiteType::Castle, -8.5, 52.5).approved();
  site.county_id = Some(tipperary);
  let cashel = s.insert_site(site).await.unwrap();

  let mut site = NewSite::new("Ring Fort", SiteType::Fort, -7.0, 52.5).approved();
  site.county_id = Some(cork);
  let fort = s.insert_site(site).await.unwrap();

  let mut site = NewSite::new("Passage Tomb", SiteType::BurialSite, -6.26, 53.35).approved();
  site.county_id = Some(dublin);
  site.significance_level = 4;
  let tomb = s.insert_site(site).await.unwrap();

  let mut site = NewSite::new("Unreviewed", SiteType::Other, -6.27, 53.36);
  site.county_id = Some(dublin);
  s.insert_site(site).await.unwrap();

  Seeded { leinster, dublin, cashel, fort, tomb }
}

/// Session key registered by [`setup`], as if issued earlier.
const KNOWN: &str = "abc";

async fn setup() -> (Router, Seeded, SqliteStore, tempfile::TempDir) {
  setup_with(ApiConfig::default()).await
}

async fn setup_with(config: ApiConfig) -> (Router, Seeded, SqliteStore, tempfile::TempDir) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let seeded = seed(&store).await;
  store.register_session(SessionContext::new(KNOWN)).await.unwrap();
  let media = tempfile::tempdir().unwrap();
  let photos = PhotoStore::new(media.path(), "/media", config.max_photo_bytes);
  let state = ApiState::new(Arc::new(store.clone()), config, photos, SessionCookie::default());
  (api_router(state), seeded, store, media)
}

async fn oneshot_raw(
  router: &Router,
  method: Method,
  uri: &str,
  session: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, HeaderMap, Vec<u8>) {
  let mut builder = Request::builder().method(method).uri(uri).header(header::HOST, "maps.example");
  if let Some(key) = session {
    builder = builder.header(header::COOKIE, format!("stair_session={key}"));
  }
  let req = match body {
    Some(v) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = router.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let headers = resp.headers().clone();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  (status, headers, bytes.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
  let (status, _, body) = oneshot_raw(router, Method::GET, uri, None, None).await;
  (status, serde_json::from_slice(&body).unwrap())
}

fn feature_ids(v: &Value) -> Vec<i64> {
  v["features"].as_array().unwrap().iter().map(|f| f["id"].as_i64().unwrap()).collect()
}

// ─── Sites ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn viewport_excludes_sites_outside_the_box() {
  let (router, s, ..) = setup().await;
  let (status, v) = get_json(&router, "/sites/in_bbox?minx=-9&miny=52&maxx=-8&maxy=53").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["type"], "FeatureCollection");
  assert_eq!(v["count"], 1);
  assert_eq!(feature_ids(&v), vec![s.cashel]);
  assert!(!feature_ids(&v).contains(&s.fort));
}

#[tokio::test]
async fn degenerate_viewport_is_rejected() {
  let (router, ..) = setup().await;
  let (status, v) = get_json(&router, "/sites/in_bbox?minx=-8&miny=52&maxx=-9&maxy=53").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(v["error"], "minx must be less than maxx");
}

#[tokio::test]
async fn nearby_rejects_points_outside_ireland() {
  let (router, ..) = setup().await;
  let (status, v) = get_json(&router, "/sites/nearby?lat=48.85&lon=2.35").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(v["error"].as_str().unwrap().starts_with("lat:"));
}

#[tokio::test]
async fn nearby_reports_distances() {
  let (router, s, ..) = setup().await;
  let (status, v) = get_json(&router, "/sites/nearby?lat=53.35&lon=-6.26&distance=5").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(feature_ids(&v), vec![s.tomb]);
  assert!(v["features"][0]["properties"]["distance_km"].as_f64().unwrap() < 1e-9);
  assert_eq!(v["features"][0]["properties"]["county_name"], "Dublin");
}

#[tokio::test]
async fn list_pages_carry_absolute_links() {
  let (router, ..) = setup().await;
  let (status, v) = get_json(&router, "/sites?page_size=1").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["count"], 3);
  assert_eq!(v["features"].as_array().unwrap().len(), 1);
  assert_eq!(v["next"], "http://maps.example/sites?page_size=1&page=2");
  assert!(v["previous"].is_null());

  let (_, last) = get_json(&router, "/sites?page_size=1&page=last").await;
  assert!(last["next"].is_null());
  assert_eq!(last["previous"], "http://maps.example/sites?page_size=1&page=2");
}

#[tokio::test]
async fn page_past_the_end_is_not_found() {
  let (router, ..) = setup().await;
  let (status, v) = get_json(&router, "/sites?page=9").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(v["error"], "Invalid page.");
}

#[tokio::test]
async fn failed_site_reads_degrade_to_empty_collections() {
  let (router, _, store, _media) = setup().await;
  store.execute_script("PRAGMA foreign_keys = OFF; DROP TABLE historical_site;").await.unwrap();

  let (status, v) = get_json(&router, "/sites?page_size=1").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["type"], "FeatureCollection");
  assert_eq!(v["count"], 0);
  assert!(v["next"].is_null());
  assert_eq!(v["features"], json!([]));

  let (status, v) = get_json(&router, "/sites/nearby?lat=53.35&lon=-6.26").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v, json!({ "type": "FeatureCollection", "features": [] }));
}

#[tokio::test]
async fn site_detail_and_missing_site() {
  let (router, s, ..) = setup().await;
  let (status, v) = get_json(&router, &format!("/sites/{}", s.tomb)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["properties"]["name_en"], "Passage Tomb");
  assert_eq!(v["properties"]["site_type_display"], "Burial Site/Tomb");

  let (status, _) = get_json(&router, "/sites/9999").await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Boundaries ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn counties_filter_by_province() {
  let (router, s, ..) = setup().await;
  let (status, v) = get_json(&router, &format!("/counties?province={}", s.leinster)).await;
  assert_eq!(status, StatusCode::OK);
  let features = v["features"].as_array().unwrap();
  assert_eq!(features.len(), 2);
  assert!(features.iter().all(|f| f["properties"]["province"] == s.leinster));

  let dublin = features.iter().find(|f| f["id"] == s.dublin).unwrap();
  assert_eq!(dublin["properties"]["site_count"], 1);
  assert_eq!(dublin["geometry"]["type"], "MultiPolygon");
}

#[tokio::test]
async fn non_integer_province_is_rejected() {
  let (router, ..) = setup().await;
  let (status, _) = get_json(&router, "/counties?province=leinster").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_layer_degrades_to_empty_collection() {
  let (router, _, store, _media) = setup().await;
  store.execute_script("PRAGMA foreign_keys = OFF; DROP TABLE county;").await.unwrap();

  let (status, headers, body) = oneshot_raw(&router, Method::GET, "/counties", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(headers[header::CONTENT_TYPE], "application/json");
  let v: Value = serde_json::from_slice(&body).unwrap();
  assert_eq!(v, json!({ "type": "FeatureCollection", "features": [] }));
}

#[tokio::test]
async fn simple_county_list_is_capped() {
  let (router, s, store, _media) = setup().await;
  for n in 0..205 {
    store
      .insert_county(NewCounty {
        name_en:        format!("Extra {n:03}"),
        name_ga:        format!("Breise {n:03}"),
        code:           format!("X{n:03}"),
        province_id:    s.leinster,
        geometry:       square(-6.0, 53.0, 0.01),
        area_km2:       None,
        population:     None,
        description_en: String::new(),
        description_ga: String::new(),
      })
      .await
      .unwrap();
  }

  let (status, v) = get_json(&router, "/counties/list_simple").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v.as_array().unwrap().len(), FALLBACK_CAP);
  assert_eq!(v[0]["name_en"], "Cork");
}

#[tokio::test]
async fn province_detail_embeds_geometry() {
  let (router, s, ..) = setup().await;
  let (status, v) = get_json(&router, &format!("/provinces/{}", s.leinster)).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v["type"], "Feature");
  assert_eq!(v["geometry"]["type"], "Polygon");
  assert_eq!(v["properties"]["county_count"], 2);
  assert!(v["properties"].get("geometry").is_none());
}

// ─── Eras and images ─────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_catalog_reads_degrade_to_empty() {
  let (router, _, store, _media) = setup().await;
  store
    .execute_script("PRAGMA foreign_keys = OFF; DROP TABLE site_image; DROP TABLE historical_era;")
    .await
    .unwrap();

  let (status, v) = get_json(&router, "/images").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v, json!({ "count": 0, "next": null, "previous": null, "results": [] }));

  let (status, v) = get_json(&router, "/images/by_site/1").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(v, json!([]));

  for uri in ["/eras", "/eras/timeline"] {
    let (status, v) = get_json(&router, uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!([]));
  }
}

#[tokio::test]
async fn images_by_site_are_capped() {
  let config = ApiConfig { fallback_cap: 3, ..ApiConfig::default() };
  let (router, s, store, _media) = setup_with(config).await;
  for n in 0..5 {
    let mut image = NewImage::new(s.tomb, format!("https://img.example/{n}.jpg"));
    image.display_order = n;
    store.insert_image(image).await.unwrap();
  }

  let (status, v) = get_json(&router, &format!("/images/by_site/{}", s.tomb)).await;
  assert_eq!(status, StatusCode::OK);
  let images = v.as_array().unwrap();
  assert_eq!(images.len(), 3);
  assert_eq!(images[0]["image_url"], "https://img.example/0.jpg");

  let (_, v) = get_json(&router, &format!("/images?site={}", s.tomb)).await;
  assert_eq!(v["count"], 5);
}

// ─── Bucket list ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn bucket_list_add_visit_and_duplicate() {
  let (router, s, ..) = setup().await;
  let body = json!({ "site_id": s.tomb });

  let (status, _, created) =
    oneshot_raw(&router, Method::POST, "/bucket-list", Some(KNOWN), Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  let created: Value = serde_json::from_slice(&created).unwrap();
  assert_eq!(created["status"], "wishlist");
  assert!(created["visited_at"].is_null());
  let id = created["id"].as_i64().unwrap();

  let (status, _, visited) = oneshot_raw(
    &router,
    Method::POST,
    &format!("/bucket-list/{id}/mark_visited"),
    Some(KNOWN),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let visited: Value = serde_json::from_slice(&visited).unwrap();
  assert_eq!(visited["status"], "visited");
  assert!(!visited["visited_at"].is_null());

  let (status, _, dup) =
    oneshot_raw(&router, Method::POST, "/bucket-list", Some(KNOWN), Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let dup: Value = serde_json::from_slice(&dup).unwrap();
  assert_eq!(dup["item_id"], id);
}

#[tokio::test]
async fn toggle_clears_visit_time() {
  let (router, s, ..) = setup().await;
  let body = json!({ "site_id": s.cashel, "status": "visited" });
  let (_, _, created) =
    oneshot_raw(&router, Method::POST, "/bucket-list", Some(KNOWN), Some(body)).await;
  let created: Value = serde_json::from_slice(&created).unwrap();
  assert!(!created["visited_at"].is_null());
  let id = created["id"].as_i64().unwrap();

  let uri = format!("/bucket-list/{id}/toggle_status");
  let (_, _, toggled) = oneshot_raw(&router, Method::POST, &uri, Some(KNOWN), None).await;
  let toggled: Value = serde_json::from_slice(&toggled).unwrap();
  assert_eq!(toggled["status"], "wishlist");
  assert!(toggled["visited_at"].is_null());
}

#[tokio::test]
async fn unknown_or_invalid_sites_are_rejected() {
  let (router, ..) = setup().await;
  let (status, _, _) = oneshot_raw(
    &router,
    Method::POST,
    "/bucket-list",
    Some(KNOWN),
    Some(json!({ "site_id": 9999 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _, _) = oneshot_raw(
    &router,
    Method::POST,
    "/bucket-list",
    Some(KNOWN),
    Some(json!({ "site_id": "forty-two" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sessions_are_issued_and_isolated() {
  let (router, s, ..) = setup().await;

  let (status, headers, created) = oneshot_raw(
    &router,
    Method::POST,
    "/bucket-list",
    None,
    Some(json!({ "site_id": s.fort })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let cookie = headers[header::SET_COOKIE].to_str().unwrap();
  assert!(cookie.starts_with("stair_session="));
  assert!(cookie.contains("HttpOnly"));
  let key = cookie["stair_session=".len()..].split(';').next().unwrap().to_owned();
  let id = serde_json::from_slice::<Value>(&created).unwrap()["id"].as_i64().unwrap();

  let uri = format!("/bucket-list/{id}");
  let (status, headers, _) = oneshot_raw(&router, Method::GET, &uri, Some(&key), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(headers.get(header::SET_COOKIE).is_none());

  let (status, _, _) = oneshot_raw(&router, Method::GET, &uri, Some(KNOWN), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unissued_session_keys_are_replaced() {
  let (router, s, ..) = setup().await;
  let (_, _, created) = oneshot_raw(
    &router,
    Method::POST,
    "/bucket-list",
    Some(KNOWN),
    Some(json!({ "site_id": s.tomb })),
  )
  .await;
  let id = serde_json::from_slice::<Value>(&created).unwrap()["id"].as_i64().unwrap();

  let (status, headers, _) =
    oneshot_raw(&router, Method::GET, "/bucket-list", Some("madeup"), None).await;
  assert_eq!(status, StatusCode::OK);
  let cookie = headers[header::SET_COOKIE].to_str().unwrap();
  assert!(cookie.starts_with("stair_session="));
  assert!(!cookie.starts_with("stair_session=madeup;"));

  let uri = format!("/bucket-list/{id}");
  let (status, _, _) = oneshot_raw(&router, Method::GET, &uri, Some("madeup"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, headers, _) = oneshot_raw(&router, Method::GET, &uri, Some(KNOWN), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn remove_then_missing() {
  let (router, s, ..) = setup().await;
  let (_, _, created) = oneshot_raw(
    &router,
    Method::POST,
    "/bucket-list",
    Some(KNOWN),
    Some(json!({ "site_id": s.cashel })),
  )
  .await;
  let id = serde_json::from_slice::<Value>(&created).unwrap()["id"].as_i64().unwrap();
  let uri = format!("/bucket-list/{id}");

  let (status, _, _) = oneshot_raw(&router, Method::DELETE, &uri, Some(KNOWN), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _, _) = oneshot_raw(&router, Method::DELETE, &uri, Some(KNOWN), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, _, list) = oneshot_raw(&router, Method::GET, "/bucket-list", Some(KNOWN), None).await;
  let list: Value = serde_json::from_slice(&list).unwrap();
  assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn photo_upload_is_stored_and_linked() {
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};

  let (router, s, _, media) = setup().await;
  let (_, _, created) = oneshot_raw(
    &router,
    Method::POST,
    "/bucket-list",
    Some(KNOWN),
    Some(json!({ "site_id": s.tomb })),
  )
  .await;
  let id = serde_json::from_slice::<Value>(&created).unwrap()["id"].as_i64().unwrap();

  let patch = json!({
    "photo": { "media_type": "image/jpeg", "data": B64.encode(b"jpeg bytes") },
    "photo_caption": "Winter solstice",
  });
  let (status, _, updated) =
    oneshot_raw(&router, Method::PATCH, &format!("/bucket-list/{id}"), Some(KNOWN), Some(patch))
      .await;
  assert_eq!(status, StatusCode::OK);
  let updated: Value = serde_json::from_slice(&updated).unwrap();
  assert_eq!(updated["photo_caption"], "Winter solstice");
  assert_eq!(updated["status"], "wishlist");

  let url = updated["photo_url"].as_str().unwrap();
  let path = url.strip_prefix("/media/").unwrap();
  assert_eq!(std::fs::read(media.path().join(path)).unwrap(), b"jpeg bytes");
}

#[tokio::test]
async fn photo_for_a_removed_item_is_not_kept() {
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};

  let (router, s, _, media) = setup().await;
  let (_, _, created) = oneshot_raw(
    &router,
    Method::POST,
    "/bucket-list",
    Some(KNOWN),
    Some(json!({ "site_id": s.tomb })),
  )
  .await;
  let id = serde_json::from_slice::<Value>(&created).unwrap()["id"].as_i64().unwrap();
  let uri = format!("/bucket-list/{id}");
  oneshot_raw(&router, Method::DELETE, &uri, Some(KNOWN), None).await;

  let photo = json!({ "media_type": "image/png", "data": B64.encode(b"png bytes") });
  let (status, _, _) =
    oneshot_raw(&router, Method::PATCH, &uri, Some(KNOWN), Some(json!({ "photo": photo.clone() })))
      .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _, _) = oneshot_raw(
    &router,
    Method::POST,
    &format!("{uri}/mark_visited"),
    Some(KNOWN),
    Some(json!({ "photo": photo })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  assert!(!media.path().join("bucket_list").exists());
}

#[tokio::test]
async fn bucket_statistics_count_visited_counties() {
  let (router, s, ..) = setup().await;
  for (site, status) in [(s.tomb, "visited"), (s.cashel, "visited"), (s.fort, "wishlist")] {
    oneshot_raw(
      &router,
      Method::POST,
      "/bucket-list",
      Some(KNOWN),
      Some(json!({ "site_id": site, "status": status })),
    )
    .await;
  }
  let (status, _, body) =
    oneshot_raw(&router, Method::GET, "/bucket-list/statistics", Some(KNOWN), None).await;
  assert_eq!(status, StatusCode::OK);
  let v: Value = serde_json::from_slice(&body).unwrap();
  assert_eq!(v["total"], 3);
  assert_eq!(v["visited"], 2);
  assert_eq!(v["wishlist"], 1);
  assert_eq!(v["counties_explored"], 2);
}
