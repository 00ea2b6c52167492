//! SQLite backend for the Stair geometry store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Point locations are indexed by an
//! R*Tree virtual table; polygon work (simplification, multi-part coercion,
//! GeoJSON assembly) runs through SQL functions registered on the connection.

mod boundaries;
mod bucket;
mod catalog;
mod encode;
mod schema;
mod sites;
mod spatial;
mod store;

pub mod error;
pub mod import;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreOptions};
