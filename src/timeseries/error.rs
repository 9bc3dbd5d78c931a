use crate::archive::error::ArchiveError;
use crate::catalogue::error::CatalogueError;
use crate::types::granularity::Granularity;
use crate::types::product::Product;
use chrono::{DateTime, FixedOffset};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeseriesError {
    #[error("Product '{}' is not offered in granularity '{}'", product.name(), granularity.name())]
    UnsupportedProduct {
        product: Product,
        granularity: Granularity,
    },

    #[error("Station '{station}' does not report '{}' in granularity '{}'", product.name(), granularity.name())]
    StationNotAvailable {
        station: String,
        product: Product,
        granularity: Granularity,
    },

    #[error("Timeseries start {start} lies after its end {end}")]
    BoundariesSwitched {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },

    #[error("Timeseries start {requested} is before the first data at {available_from}")]
    StartTooEarly {
        requested: DateTime<FixedOffset>,
        available_from: DateTime<FixedOffset>,
    },

    #[error("Timeseries end {requested} is after the last data at {available_until}")]
    EndTooLate {
        requested: DateTime<FixedOffset>,
        available_until: DateTime<FixedOffset>,
    },

    #[error("Failed to read description document '{0}'")]
    DescriptionRead(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
