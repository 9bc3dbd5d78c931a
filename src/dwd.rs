//! The main entry point: discovering stations on the DWD open data server,
//! reading the published station snapshot and querying station timeseries.

use crate::catalogue::crawler::Crawler;
use crate::catalogue::downloader::Downloader;
use crate::catalogue::error::CatalogueError;
use crate::catalogue::page::{directory_url, send_checked};
use crate::config::DwdConfig;
use crate::discovery::coordinator::{CrawlerSource, DiscoveryCoordinator};
use crate::discovery::snapshot::decode_snapshot;
use crate::discovery::store::{CacheStore, MemoryStore};
use crate::error::DwdError;
use crate::stations::locate_station::{CapabilityFilter, StationLocator};
use crate::stations::merge::merge_by_location;
use crate::timeseries::fetcher::{TimeseriesFetcher, TimeseriesQuery};
use crate::types::datapoint::{HealthStatus, Timeseries};
use crate::types::date_range::DateTimeRange;
use crate::types::granularity::Granularity;
use crate::types::product::{supported_pairs, Product};
use crate::types::station::{Capability, Station};
use crate::utils::ensure_dir_exists;
use bon::bon;
use chrono::{DateTime, FixedOffset};
use futures_util::{stream, StreamExt, TryStreamExt};
use log::warn;
use serde_json::{json, Value};
use std::sync::Arc;
use url::Url;

/// Represents a geographical coordinate using latitude and longitude.
///
/// # Examples
///
/// ```
/// use dwd_climate::LatLon;
///
/// let osnabrueck = LatLon(52.2799, 8.0472);
/// assert_eq!(osnabrueck.0, 52.2799); // Latitude
/// assert_eq!(osnabrueck.1, 8.0472); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

/// Client for one DWD open data deployment.
///
/// Discovery results are published to, and read back from, a [`CacheStore`]
/// shared by every instance of a service. [`DwdClimate::new`] keeps the
/// snapshot in process memory.
///
/// # Examples
///
/// ```rust,no_run
/// # use dwd_climate::{DwdClimate, DwdError, Granularity, Product};
/// # async fn run() -> Result<(), DwdError> {
/// let client = DwdClimate::new().await?;
/// let stations = client
///     .discover_product("climateObservations", Granularity::Hourly, Product::AirTemperature)
///     .await?;
/// println!("{} stations report hourly air temperature", stations.len());
/// # Ok(())
/// # }
/// ```
pub struct DwdClimate<S = MemoryStore> {
    config: DwdConfig,
    crawler: Crawler,
    store: Arc<S>,
}

impl DwdClimate<MemoryStore> {
    /// Creates a client with the default configuration and an in-memory store.
    pub async fn new() -> Result<Self, DwdError> {
        Self::with_config(DwdConfig::default()).await
    }

    pub async fn with_config(config: DwdConfig) -> Result<Self, DwdError> {
        Self::with_store(config, Arc::new(MemoryStore::new())).await
    }
}

#[bon]
impl<S> DwdClimate<S>
where
    S: CacheStore + 'static,
{
    /// Creates a client publishing to and reading from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`DwdError::DownloadDirResolution`] if no download directory is
    /// configured and the user cache directory cannot be found, and
    /// [`DwdError::DownloadDirCreation`] if the directory cannot be created.
    pub async fn with_store(config: DwdConfig, store: Arc<S>) -> Result<Self, DwdError> {
        let download_dir = config
            .resolve_download_dir()
            .map_err(DwdError::DownloadDirResolution)?;
        ensure_dir_exists(&download_dir)
            .await
            .map_err(|e| DwdError::DownloadDirCreation(download_dir.clone(), e))?;

        let client = config.http_client().map_err(CatalogueError::ClientBuild)?;
        let downloader = Downloader::new(client.clone(), download_dir);
        let crawler = Crawler::new(&config, client, downloader);
        Ok(Self {
            config,
            crawler,
            store,
        })
    }

    pub fn config(&self) -> &DwdConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The root URL of a configured database.
    ///
    /// # Errors
    ///
    /// Returns [`DwdError::UnknownDatabase`] for names missing from [`DwdConfig::databases`].
    pub fn database_url(&self, database: &str) -> Result<Url, DwdError> {
        let root = self
            .config
            .database_root(database)
            .ok_or_else(|| DwdError::UnknownDatabase(database.to_string()))?;
        Ok(directory_url(root)?)
    }

    /// Crawls every product folder of a database and returns the reconciled stations.
    pub async fn discover(&self, database: &str) -> Result<Vec<Station>, DwdError> {
        let root = self.database_url(database)?;
        Ok(self.crawler.discover(&root).await?)
    }

    /// Crawls the station lists of a single `{granularity}/{product}/` folder.
    pub async fn discover_product(
        &self,
        database: &str,
        granularity: Granularity,
        product: Product,
    ) -> Result<Vec<Station>, DwdError> {
        if !product.is_available_in(granularity) {
            return Err(DwdError::UnsupportedProduct {
                product,
                granularity,
            });
        }
        let root = self.database_url(database)?;
        Ok(self
            .crawler
            .discover_product(&root, granularity, product)
            .await?)
    }

    /// Runs [`Self::discover_product`] for every supported pair and merges the
    /// results by station location. Pairs the server does not carry are skipped.
    pub async fn discover_all(&self, database: &str) -> Result<Vec<Station>, DwdError> {
        let root = self.database_url(database)?;
        let per_product: Vec<Vec<Station>> = stream::iter(supported_pairs())
            .map(|(granularity, product)| {
                let root = &root;
                async move {
                    match self.crawler.discover_product(root, granularity, product).await {
                        Err(CatalogueError::NotFound { url }) => {
                            warn!("Skipping missing product folder {}", url);
                            Ok(Vec::new())
                        }
                        result => result,
                    }
                }
            })
            .buffer_unordered(self.config.concurrency())
            .try_collect()
            .await?;
        Ok(merge_by_location(per_product.into_iter().flatten()))
    }

    /// A coordinator that publishes crawls of `database` into this client's store.
    pub fn coordinator(
        &self,
        database: &str,
    ) -> Result<DiscoveryCoordinator<S, CrawlerSource>, DwdError> {
        let root = self.database_url(database)?;
        let source = CrawlerSource::new(self.crawler.clone(), root);
        Ok(DiscoveryCoordinator::new(
            self.store.clone(),
            Arc::new(source),
            &self.config,
        ))
    }

    /// Probes the root of every configured database.
    pub async fn check_databases(&self) -> Vec<HealthStatus> {
        let probes = self.config.databases.iter().map(|(name, root)| async move {
            let failure = match directory_url(root) {
                Ok(url) => send_checked(self.crawler.client(), url.as_str()).await.err(),
                Err(e) => Some(e),
            };
            let reason = failure.map(|e| e.to_string());
            HealthStatus {
                database: name.clone(),
                healthy: reason.is_none(),
                reason,
            }
        });
        futures_util::future::join_all(probes).await
    }

    /// Downloads and parses one station's archives of a product.
    ///
    /// The request is validated against the station's availability window
    /// before anything is downloaded. Omitted bounds leave the series open on
    /// that side.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use dwd_climate::{DwdClimate, DwdError, Granularity, Product, parse_timestamp};
    /// # async fn run() -> Result<(), DwdError> {
    /// let client = DwdClimate::new().await?;
    /// let series = client
    ///     .timeseries()
    ///     .database("climateObservations")
    ///     .product(Product::AirTemperature)
    ///     .granularity(Granularity::Hourly)
    ///     .station("00044")
    ///     .start(parse_timestamp("2023010100")?)
    ///     .call()
    ///     .await?;
    /// for point in series.field("TT_TU").take(3) {
    ///     println!("{} {:?}", point.timestamp, point.value);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn timeseries(
        &self,
        database: &str,
        product: Product,
        granularity: Granularity,
        station: &str,
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
    ) -> Result<Timeseries, DwdError> {
        let root = self.database_url(database)?;
        let query = TimeseriesQuery {
            product,
            granularity,
            station_id: station.to_string(),
            range: DateTimeRange::new(start, end),
        };
        Ok(TimeseriesFetcher::new(self.crawler.clone())
            .fetch(&root, &query)
            .await?)
    }

    /// All stations of the last published snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`DwdError::SnapshotUnavailable`] until a discovery has succeeded.
    pub async fn stations(&self) -> Result<Vec<Station>, DwdError> {
        let bytes = self
            .store
            .get(&self.config.snapshot_key)
            .await?
            .ok_or(DwdError::SnapshotUnavailable)?;
        Ok(decode_snapshot(&bytes).await?)
    }

    pub async fn station(&self, id: &str) -> Result<Station, DwdError> {
        self.stations()
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| DwdError::UnknownStation(id.to_string()))
    }

    /// The availability windows of a station for one product, one per granularity.
    pub async fn station_capabilities(
        &self,
        id: &str,
        product: Product,
    ) -> Result<Vec<Capability>, DwdError> {
        let station = self.station(id).await?;
        Ok(station.capabilities.for_product(product).copied().collect())
    }

    /// The snapshot as a GeoJSON `FeatureCollection`.
    pub async fn stations_geojson(&self) -> Result<Value, DwdError> {
        let features: Vec<Value> = self.stations().await?.iter().map(Station::to_feature).collect();
        Ok(json!({
            "type": "FeatureCollection",
            "features": features,
        }))
    }

    /// Finds snapshot stations near a location, closest first.
    ///
    /// Defaults to at most 5 stations within 50 km. `capability` restricts the
    /// result to stations offering a (product, granularity) pair, optionally
    /// over a whole time window.
    #[builder]
    pub async fn find_stations(
        &self,
        location: LatLon,
        capability: Option<CapabilityFilter>,
        max_distance_km: Option<f64>,
        station_limit: Option<usize>,
    ) -> Result<Vec<Station>, DwdError> {
        let locator = StationLocator::new(self.stations().await?);
        let stations_with_distance = locator.checked_query(
            location.0,
            location.1,
            station_limit.unwrap_or(5),
            max_distance_km.unwrap_or(50.0),
            capability,
        )?;
        Ok(stations_with_distance
            .into_iter()
            .map(|(station, _distance)| station)
            .collect())
    }
}
