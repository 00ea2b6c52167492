//! Aggregate counts over the visible site catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sites per era, ordered by the era's start year. Sites without an era are
/// grouped under `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraCount {
  pub name:      Option<String>,
  pub color_hex: Option<String>,
  pub count:     i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCount {
  pub name:  Option<String>,
  pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteStatistics {
  pub total_sites:        i64,
  pub national_monuments: i64,
  pub unesco_sites:       i64,
  pub by_site_type:       BTreeMap<String, i64>,
  pub by_era:             Vec<EraCount>,
  /// The ten counties with the most sites.
  pub by_county:          Vec<NamedCount>,
  pub by_significance:    BTreeMap<u8, i64>,
}

/// Number of counties reported in [`SiteStatistics::by_county`].
pub const TOP_COUNTIES: usize = 10;
