mod archive;
mod catalogue;
mod config;
mod discovery;
mod dwd;
mod error;
mod stations;
mod timeseries;
mod types;
mod utils;

pub use config::{DwdConfig, CLIMATE_OBSERVATIONS};
pub use dwd::*;
pub use error::DwdError;

pub use types::datapoint::*;
pub use types::date_range::DateTimeRange;
pub use types::enum_set::EnumSet;
pub use types::granularity::{Granularity, GranularitySet, UnknownGranularity};
pub use types::product::{products_for, supported_pairs, Product, ProductSet, UnknownProduct};
pub use types::quality_flag::QualityFlag;
pub use types::station::*;
pub use types::timestamp::{localize, parse_timestamp, LegacyDateFormat, TimestampError};

pub use archive::encoding::decode_windows_1252;
pub use archive::parser::{parse_archive, parse_archive_blocking, parse_reader, ParsedArchive};

pub use catalogue::crawler::{product_url, Crawler, ProductFolder, StationFiles, StationListSource};
pub use catalogue::downloader::{DownloadedFile, Downloader};
pub use catalogue::page::{directory_url, fetch_index, IndexPage};
pub use catalogue::station_list::{parse_station_list, read_station_list, StationListRow};

pub use discovery::coordinator::{
    CrawlerSource, DiscoveryCoordinator, DiscoveryOutcome, StationSource,
};
pub use discovery::redis_store::RedisStore;
pub use discovery::snapshot::{decode_snapshot, encode_snapshot};
pub use discovery::store::{CacheStore, MemoryStore};

pub use stations::locate_station::{CapabilityFilter, StationLocator};
pub use stations::merge::{merge, merge_by_location};
pub use stations::registry::StationRegistry;

pub use timeseries::description::{describe, display_name, sniff_mime_type};
pub use timeseries::fetcher::{validate_window, TimeseriesFetcher, TimeseriesQuery};

pub use archive::error::ArchiveError;
pub use catalogue::error::CatalogueError;
pub use discovery::error::{DiscoveryError, StoreError};
pub use stations::error::LocateStationError;
pub use timeseries::error::TimeseriesError;
