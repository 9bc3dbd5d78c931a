//! Defines the temporal resolutions ("granularities") the open data server
//! publishes observations in.

use crate::types::enum_set::EnumSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Represents the temporal sampling resolution of a product.
///
/// Every variant has two stable string forms: the folder name used on the
/// server (see [`Granularity::path_segment`]) and a camel-cased name used in
/// serialized output (see [`Granularity::name`]). [`FromStr`] accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Granularity {
    /// Observations for every minute (`1_minute`).
    EveryMinute,
    /// Observations every five minutes (`5_minutes`).
    EveryFiveMinutes,
    /// Observations every ten minutes (`10_minutes`).
    EveryTenMinutes,
    /// Hourly observations.
    Hourly,
    /// Observations at the fixed synoptic terms of a day (`subdaily`).
    SubDaily,
    /// Daily values.
    Daily,
    /// Monthly values.
    Monthly,
    /// Annual values.
    Annual,
    /// Multi-annual means (`multi_annual`).
    MultiAnnual,
}

impl Granularity {
    pub const ALL: [Granularity; 9] = [
        Granularity::EveryMinute,
        Granularity::EveryFiveMinutes,
        Granularity::EveryTenMinutes,
        Granularity::Hourly,
        Granularity::SubDaily,
        Granularity::Daily,
        Granularity::Monthly,
        Granularity::Annual,
        Granularity::MultiAnnual,
    ];

    /// The folder name of this granularity on the open data server.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Granularity::EveryMinute => "1_minute",
            Granularity::EveryFiveMinutes => "5_minutes",
            Granularity::EveryTenMinutes => "10_minutes",
            Granularity::Hourly => "hourly",
            Granularity::SubDaily => "subdaily",
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
            Granularity::Annual => "annual",
            Granularity::MultiAnnual => "multi_annual",
        }
    }

    /// The camel-cased name used in serialized output.
    pub fn name(&self) -> &'static str {
        match self {
            Granularity::EveryMinute => "everyMinute",
            Granularity::EveryFiveMinutes => "everyFiveMinutes",
            Granularity::EveryTenMinutes => "everyTenMinutes",
            Granularity::Hourly => "hourly",
            Granularity::SubDaily => "subDaily",
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
            Granularity::Annual => "annual",
            Granularity::MultiAnnual => "multiAnnual",
        }
    }

    /// Resolves a directory-index folder link (e.g. `"hourly/"`) to a granularity.
    pub fn from_folder(folder: &str) -> Option<Self> {
        folder.trim_end_matches('/').parse().ok()
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown granularity '{0}'")]
pub struct UnknownGranularity(pub String);

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Granularity::ALL
            .into_iter()
            .find(|g| g.path_segment() == s || g.name() == s)
            .ok_or_else(|| UnknownGranularity(s.to_string()))
    }
}

/// A set of granularities, e.g. every resolution a station reports a product in.
///
/// Displays as a comma separated list of folder names and parses back from it.
pub type GranularitySet = EnumSet<Granularity>;
