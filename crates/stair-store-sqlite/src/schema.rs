//! SQL schema for the Stair SQLite store.
//!
//! Executed once at connection startup. The schema version is recorded in
//! `PRAGMA user_version`; future migrations will be gated on that number.

pub const SCHEMA_VERSION: i64 = 1;

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS province (
    id              INTEGER PRIMARY KEY,
    name_en         TEXT NOT NULL UNIQUE,
    name_ga         TEXT NOT NULL UNIQUE,
    code            TEXT NOT NULL UNIQUE,
    geometry        TEXT NOT NULL,              -- GeoJSON (Multi)Polygon, WGS84
    area_km2        REAL,
    population      INTEGER,
    description_en  TEXT NOT NULL DEFAULT '',
    description_ga  TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    is_deleted      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS county (
    id              INTEGER PRIMARY KEY,
    name_en         TEXT NOT NULL UNIQUE,
    name_ga         TEXT NOT NULL UNIQUE,
    code            TEXT NOT NULL UNIQUE,
    province_id     INTEGER NOT NULL REFERENCES province(id),
    geometry        TEXT NOT NULL,
    area_km2        REAL,
    population      INTEGER,
    description_en  TEXT NOT NULL DEFAULT '',
    description_ga  TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    is_deleted      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS historical_era (
    id              INTEGER PRIMARY KEY,
    name_en         TEXT NOT NULL UNIQUE,
    name_ga         TEXT NOT NULL UNIQUE,
    start_year      INTEGER NOT NULL,           -- negative for BCE
    end_year        INTEGER NOT NULL,
    display_order   INTEGER NOT NULL DEFAULT 0,
    color_hex       TEXT NOT NULL DEFAULT '#000000',
    description_en  TEXT NOT NULL DEFAULT '',
    description_ga  TEXT NOT NULL DEFAULT '',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    is_deleted      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS historical_site (
    id                  INTEGER PRIMARY KEY,
    name_en             TEXT NOT NULL,
    name_ga             TEXT NOT NULL DEFAULT '',
    description_en      TEXT NOT NULL DEFAULT '',
    description_ga      TEXT NOT NULL DEFAULT '',
    longitude           REAL NOT NULL,
    latitude            REAL NOT NULL,
    elevation           REAL,                   -- Z ordinate of the location
    elevation_meters    REAL,
    county_id           INTEGER REFERENCES county(id),
    era_id              INTEGER REFERENCES historical_era(id),
    date_established    TEXT,                   -- YYYY-MM-DD
    date_abandoned      TEXT,
    construction_period TEXT NOT NULL DEFAULT '',
    site_type           TEXT NOT NULL,
    significance_level  INTEGER NOT NULL DEFAULT 2
                        CHECK (significance_level BETWEEN 1 AND 4),
    preservation_status TEXT,
    national_monument   INTEGER NOT NULL DEFAULT 0,
    unesco_site         INTEGER NOT NULL DEFAULT 0,
    is_public_access    INTEGER NOT NULL DEFAULT 1,
    visitor_center      INTEGER NOT NULL DEFAULT 0,
    admission_required  INTEGER NOT NULL DEFAULT 0,
    address             TEXT NOT NULL DEFAULT '',
    eircode             TEXT NOT NULL DEFAULT '',
    website_url         TEXT NOT NULL DEFAULT '',
    phone_number        TEXT NOT NULL DEFAULT '',
    data_source         TEXT NOT NULL DEFAULT '',
    approval_status     TEXT NOT NULL DEFAULT 'pending',
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    is_deleted          INTEGER NOT NULL DEFAULT 0
);

-- Point index over site locations. Maintained by the triggers below; never
-- written directly.
CREATE VIRTUAL TABLE IF NOT EXISTS site_rtree USING rtree(
    id,
    min_lon, max_lon,
    min_lat, max_lat
);

CREATE TRIGGER IF NOT EXISTS site_rtree_insert AFTER INSERT ON historical_site
BEGIN
    INSERT INTO site_rtree (id, min_lon, max_lon, min_lat, max_lat)
    VALUES (NEW.id, NEW.longitude, NEW.longitude, NEW.latitude, NEW.latitude);
END;

CREATE TRIGGER IF NOT EXISTS site_rtree_update
AFTER UPDATE OF longitude, latitude ON historical_site
BEGIN
    UPDATE site_rtree
       SET min_lon = NEW.longitude, max_lon = NEW.longitude,
           min_lat = NEW.latitude,  max_lat = NEW.latitude
     WHERE id = NEW.id;
END;

CREATE TRIGGER IF NOT EXISTS site_rtree_delete AFTER DELETE ON historical_site
BEGIN
    DELETE FROM site_rtree WHERE id = OLD.id;
END;

CREATE TABLE IF NOT EXISTS site_image (
    id              INTEGER PRIMARY KEY,
    site_id         INTEGER NOT NULL REFERENCES historical_site(id) ON DELETE CASCADE,
    image_url       TEXT NOT NULL,
    thumbnail_url   TEXT NOT NULL DEFAULT '',
    title_en        TEXT NOT NULL DEFAULT '',
    title_ga        TEXT NOT NULL DEFAULT '',
    caption_en      TEXT NOT NULL DEFAULT '',
    caption_ga      TEXT NOT NULL DEFAULT '',
    photographer    TEXT NOT NULL DEFAULT '',
    photo_date      TEXT,
    is_primary      INTEGER NOT NULL DEFAULT 0,
    display_order   INTEGER NOT NULL DEFAULT 0,
    width_px        INTEGER,
    height_px       INTEGER,
    is_public       INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL,
    is_deleted      INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS site_source (
    id                INTEGER PRIMARY KEY,
    site_id           INTEGER NOT NULL REFERENCES historical_site(id) ON DELETE CASCADE,
    source_type       TEXT NOT NULL,
    title             TEXT NOT NULL,
    author            TEXT NOT NULL DEFAULT '',
    publication_year  INTEGER,
    publisher         TEXT NOT NULL DEFAULT '',
    url               TEXT NOT NULL DEFAULT '',
    isbn              TEXT NOT NULL DEFAULT '',
    pages             TEXT NOT NULL DEFAULT '',
    notes             TEXT NOT NULL DEFAULT '',
    reliability_score INTEGER NOT NULL DEFAULT 3
                      CHECK (reliability_score BETWEEN 1 AND 5),
    created_at        TEXT NOT NULL,
    is_deleted        INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS session (
    key                 TEXT PRIMARY KEY,
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bucket_list_item (
    id                  INTEGER PRIMARY KEY,
    session_key         TEXT NOT NULL,
    site_id             INTEGER NOT NULL REFERENCES historical_site(id) ON DELETE CASCADE,
    status              TEXT NOT NULL DEFAULT 'wishlist'
                        CHECK (status IN ('wishlist', 'visited')),
    added_at            TEXT NOT NULL,
    visited_at          TEXT,
    photo_path          TEXT,
    photo_hash          TEXT,
    photo_media_type    TEXT,
    photo_caption       TEXT NOT NULL DEFAULT '',
    updated_at          TEXT NOT NULL,
    is_deleted          INTEGER NOT NULL DEFAULT 0,
    CHECK ((status = 'wishlist') = (visited_at IS NULL))
);

-- At most one active item per (session, site).
CREATE UNIQUE INDEX IF NOT EXISTS bucket_active_unique
    ON bucket_list_item(session_key, site_id) WHERE is_deleted = 0;

CREATE INDEX IF NOT EXISTS idx_county_province   ON county(province_id);
CREATE INDEX IF NOT EXISTS idx_era_start         ON historical_era(start_year, display_order);
CREATE INDEX IF NOT EXISTS idx_site_visible      ON historical_site(approval_status, is_deleted);
CREATE INDEX IF NOT EXISTS idx_site_significance ON historical_site(significance_level DESC, name_en);
CREATE INDEX IF NOT EXISTS idx_site_county       ON historical_site(county_id);
CREATE INDEX IF NOT EXISTS idx_site_era          ON historical_site(era_id);
CREATE INDEX IF NOT EXISTS idx_site_type         ON historical_site(site_type);
CREATE INDEX IF NOT EXISTS idx_image_site        ON site_image(site_id, is_primary DESC, display_order);
CREATE INDEX IF NOT EXISTS idx_source_site       ON site_source(site_id);
CREATE INDEX IF NOT EXISTS idx_bucket_session    ON bucket_list_item(session_key, is_deleted, added_at);
";
