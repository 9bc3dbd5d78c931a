//! Immutable configuration shared by the crawler, downloader and discovery coordinator.

use crate::utils::get_cache_dir;
use bon::Builder;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

pub const CLIMATE_OBSERVATIONS: &str = "climateObservations";
const CLIMATE_OBSERVATIONS_URL: &str =
    "https://opendata.dwd.de/climate_environment/CDC/observations_germany/climate/";
const DEFAULT_STATION_LIST_SUFFIX: &str = "Beschreibung_Stationen.txt";
const DEFAULT_RUNNING_FLAG_KEY: &str = "dwd-discovery-running";
const DEFAULT_SNAPSHOT_KEY: &str = "dwd-station-list";
const DOWNLOAD_DIR_NAME: &str = "downloads";

fn default_databases() -> BTreeMap<String, String> {
    BTreeMap::from([(
        CLIMATE_OBSERVATIONS.to_string(),
        CLIMATE_OBSERVATIONS_URL.to_string(),
    )])
}

/// Settings for talking to the open data server and the shared store.
///
/// # Examples
///
/// ```
/// use dwd_climate::DwdConfig;
/// use std::time::Duration;
///
/// let config = DwdConfig::builder()
///     .max_concurrent_requests(4)
///     .discovery_interval(Duration::from_secs(60))
///     .build();
/// assert_eq!(config.snapshot_key, "dwd-station-list");
/// assert!(config.database_root("climateObservations").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct DwdConfig {
    /// Database name to root URL of its directory-index tree.
    #[builder(default = default_databases())]
    pub databases: BTreeMap<String, String>,
    /// File names ending in this are station lists.
    #[builder(into, default = DEFAULT_STATION_LIST_SUFFIX.to_string())]
    pub station_list_suffix: String,
    /// Upper bound of outstanding HTTP requests, shared by every crawl level.
    #[builder(default = 16)]
    pub max_concurrent_requests: usize,
    #[builder(default = Duration::from_secs(120))]
    pub request_timeout: Duration,
    /// Where downloads are staged. Defaults to a folder in the user cache directory.
    pub download_dir: Option<PathBuf>,
    #[builder(default = Duration::from_secs(5 * 60))]
    pub discovery_interval: Duration,
    #[builder(into, default = DEFAULT_RUNNING_FLAG_KEY.to_string())]
    pub running_flag_key: String,
    #[builder(into, default = DEFAULT_SNAPSHOT_KEY.to_string())]
    pub snapshot_key: String,
}

impl Default for DwdConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DwdConfig {
    pub fn database_root(&self, name: &str) -> Option<&str> {
        self.databases.get(name).map(String::as_str)
    }

    /// The configured download directory, or the default one below the user cache dir.
    pub fn resolve_download_dir(&self) -> io::Result<PathBuf> {
        match &self.download_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_cache_dir().map(|dir| dir.join(DOWNLOAD_DIR_NAME)),
        }
    }

    pub fn http_client(&self) -> reqwest::Result<Client> {
        Client::builder().timeout(self.request_timeout).build()
    }

    /// Concurrency used for fan-out, never below one.
    pub(crate) fn concurrency(&self) -> usize {
        self.max_concurrent_requests.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_public_server() {
        let config = DwdConfig::default();
        assert_eq!(
            config.database_root(CLIMATE_OBSERVATIONS),
            Some(CLIMATE_OBSERVATIONS_URL)
        );
        assert_eq!(config.station_list_suffix, "Beschreibung_Stationen.txt");
        assert_eq!(config.discovery_interval, Duration::from_secs(300));
        assert_eq!(config.running_flag_key, "dwd-discovery-running");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: DwdConfig =
            serde_json::from_str(r#"{"max_concurrent_requests": 2, "snapshot_key": "k"}"#).unwrap();
        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.snapshot_key, "k");
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn explicit_download_dir_wins() {
        let config = DwdConfig::builder().download_dir(PathBuf::from("/tmp/dwd")).build();
        assert_eq!(config.resolve_download_dir().unwrap(), PathBuf::from("/tmp/dwd"));
        assert_eq!(DwdConfig::builder().max_concurrent_requests(0).build().concurrency(), 1);
    }
}
