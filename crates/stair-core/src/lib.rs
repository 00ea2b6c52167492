//! Core types and trait definitions for the Stair historical sites engine.
//!
//! This crate has no HTTP or database dependencies. It owns the domain
//! model, the spatial query planner, the result pager and the bucket-list
//! state machine. Storage backends implement [`store::GeoStore`].

// Trait methods spell out `Send` futures in their signatures; impls use
// plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod boundary;
pub mod bucket;
pub mod era;
pub mod error;
pub mod pager;
pub mod planner;
pub mod session;
pub mod site;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
