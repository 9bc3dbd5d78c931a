use crate::archive::error::ArchiveError;
use crate::catalogue::error::CatalogueError;
use crate::discovery::error::{DiscoveryError, StoreError};
use crate::stations::error::LocateStationError;
use crate::timeseries::error::TimeseriesError;
use crate::types::granularity::Granularity;
use crate::types::product::Product;
use crate::types::timestamp::TimestampError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DwdError {
    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    LocateStation(#[from] LocateStationError),

    #[error(transparent)]
    Timeseries(#[from] TimeseriesError),

    #[error("Unknown database '{0}'")]
    UnknownDatabase(String),

    #[error("Unknown station '{0}'")]
    UnknownStation(String),

    #[error("Product '{}' is not offered in granularity '{}'", product.name(), granularity.name())]
    UnsupportedProduct {
        product: Product,
        granularity: Granularity,
    },

    #[error("No station snapshot has been published yet")]
    SnapshotUnavailable,

    #[error("Failed to create download directory '{0}'")]
    DownloadDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine download directory")]
    DownloadDirResolution(#[source] std::io::Error),
}
