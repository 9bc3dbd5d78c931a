//! Single-flight discovery runs and publication of the station snapshot.
//!
//! The coordinator owns two keys in the shared store: a `true`/`false` flag
//! marking a running discovery, and the compressed snapshot of the last
//! successful one. A run is only started by whoever flips the flag from idle
//! to running, and the flag is cleared again however the run ends.

use crate::catalogue::crawler::Crawler;
use crate::config::DwdConfig;
use crate::discovery::error::{DiscoveryError, StoreError};
use crate::discovery::snapshot::{decode_snapshot, encode_snapshot};
use crate::discovery::store::CacheStore;
use crate::types::station::Station;
use async_trait::async_trait;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use url::Url;

/// Produces the full station set of one discovery run.
#[async_trait]
pub trait StationSource: Send + Sync {
    async fn discover(&self) -> Result<Vec<Station>, DiscoveryError>;
}

/// Crawls one database root.
pub struct CrawlerSource {
    crawler: Crawler,
    root: Url,
}

impl CrawlerSource {
    pub fn new(crawler: Crawler, root: Url) -> Self {
        Self { crawler, root }
    }
}

#[async_trait]
impl StationSource for CrawlerSource {
    async fn discover(&self) -> Result<Vec<Station>, DiscoveryError> {
        Ok(self.crawler.discover(&self.root).await?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// A new snapshot holding this many stations was written.
    Published { stations: usize },
    /// Another run held the flag; nothing was done.
    AlreadyRunning,
}

pub struct DiscoveryCoordinator<S, D> {
    store: Arc<S>,
    source: Arc<D>,
    running_flag_key: String,
    snapshot_key: String,
    interval: Duration,
}

/// The running flag held by one discovery run.
///
/// Dropping it without [`RunningFlag::release`], as happens when the run is
/// cancelled or panics, clears the flag from a background task.
struct RunningFlag<S: CacheStore + 'static> {
    store: Arc<S>,
    key: String,
    released: bool,
}

impl<S: CacheStore + 'static> RunningFlag<S> {
    async fn release(mut self) -> Result<(), StoreError> {
        let cleared = self.store.clear_flag(&self.key).await;
        self.released = true;
        cleared
    }
}

impl<S: CacheStore + 'static> Drop for RunningFlag<S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("No runtime left to clear discovery flag '{}'", self.key);
            return;
        };
        warn!("Discovery run aborted, clearing flag '{}'", self.key);
        let store = self.store.clone();
        let key = std::mem::take(&mut self.key);
        runtime.spawn(async move {
            if let Err(e) = store.clear_flag(&key).await {
                error!("Failed to clear discovery flag: {}", e);
            }
        });
    }
}

impl<S, D> DiscoveryCoordinator<S, D>
where
    S: CacheStore + 'static,
    D: StationSource + 'static,
{
    pub fn new(store: Arc<S>, source: Arc<D>, config: &DwdConfig) -> Self {
        Self {
            store,
            source,
            running_flag_key: config.running_flag_key.clone(),
            snapshot_key: config.snapshot_key.clone(),
            interval: config.discovery_interval,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Runs a discovery unless one is already in progress anywhere.
    ///
    /// On failure the previously published snapshot stays in place.
    pub async fn start_if_idle(&self) -> Result<DiscoveryOutcome, DiscoveryError> {
        if !self.store.acquire_flag(&self.running_flag_key).await? {
            warn!("Discovery already running, skipping this turn");
            return Ok(DiscoveryOutcome::AlreadyRunning);
        }
        let flag = RunningFlag {
            store: self.store.clone(),
            key: self.running_flag_key.clone(),
            released: false,
        };
        info!("Starting station discovery");

        let result = self.publish().await;
        let cleared = flag.release().await;

        match result {
            Ok(stations) => {
                cleared?;
                info!("Published snapshot with {} stations", stations);
                Ok(DiscoveryOutcome::Published { stations })
            }
            Err(e) => {
                error!("Station discovery failed: {}", e);
                if let Err(clear_error) = cleared {
                    error!("Failed to clear discovery flag: {}", clear_error);
                }
                Err(e)
            }
        }
    }

    async fn publish(&self) -> Result<usize, DiscoveryError> {
        let stations = self.source.discover().await?;
        let snapshot = encode_snapshot(&stations).await?;
        self.store.set(&self.snapshot_key, &snapshot).await?;
        Ok(stations.len())
    }

    /// Runs a discovery if no snapshot has been published yet.
    pub async fn bootstrap_if_missing(&self) -> Result<Option<DiscoveryOutcome>, DiscoveryError> {
        if self.store.exists(&self.snapshot_key).await? {
            return Ok(None);
        }
        info!("No station snapshot found, running initial discovery");
        self.start_if_idle().await.map(Some)
    }

    /// The last published stations, if any run succeeded so far.
    pub async fn read_snapshot(&self) -> Result<Option<Vec<Station>>, DiscoveryError> {
        match self.store.get(&self.snapshot_key).await? {
            Some(bytes) => Ok(Some(decode_snapshot(&bytes).await?)),
            None => Ok(None),
        }
    }

    /// Bootstraps once, then re-triggers [`Self::start_if_idle`] every
    /// [`DwdConfig::discovery_interval`]. Failed runs are logged and retried on
    /// the next tick.
    pub fn spawn_scheduler(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.interval;
        tokio::spawn(async move {
            if let Err(e) = self.bootstrap_if_missing().await {
                error!("Initial discovery failed: {}", e);
            }
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.start_if_idle().await {
                    error!("Scheduled discovery failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::error::CatalogueError;
    use crate::discovery::store::{MemoryStore, FLAG_CLEAR};
    use crate::types::granularity::Granularity;
    use crate::types::product::Product;
    use crate::types::station::tests::{capability, station};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingSource {
        runs: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl CountingSource {
        fn new(delay: Duration) -> Self {
            Self {
                runs: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay,
            }
        }
    }

    #[async_trait]
    impl StationSource for CountingSource {
        async fn discover(&self) -> Result<Vec<Station>, DiscoveryError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(CatalogueError::NotFound {
                    url: "https://example.org/".to_string(),
                }
                .into());
            }
            Ok(vec![station(
                "00001",
                &[capability(Product::AirTemperature, Granularity::Hourly, "19500101", "20230101")],
            )])
        }
    }

    struct PanickingSource;

    #[async_trait]
    impl StationSource for PanickingSource {
        async fn discover(&self) -> Result<Vec<Station>, DiscoveryError> {
            panic!("crawl blew up");
        }
    }

    fn coordinator(delay: Duration) -> DiscoveryCoordinator<MemoryStore, CountingSource> {
        DiscoveryCoordinator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(CountingSource::new(delay)),
            &DwdConfig::default(),
        )
    }

    #[tokio::test]
    async fn concurrent_starts_run_once() {
        let coordinator = coordinator(Duration::from_millis(100));
        let (first, second) = tokio::join!(coordinator.start_if_idle(), coordinator.start_if_idle());
        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|o| matches!(o, DiscoveryOutcome::AlreadyRunning));
        assert_eq!(
            outcomes,
            vec![
                DiscoveryOutcome::Published { stations: 1 },
                DiscoveryOutcome::AlreadyRunning
            ]
        );
        assert_eq!(coordinator.source.runs.load(Ordering::SeqCst), 1);

        let flag = coordinator.store.get("dwd-discovery-running").await.unwrap();
        assert_eq!(flag.as_deref(), Some(FLAG_CLEAR));
        let snapshot = coordinator.read_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot[0].id, "00001");
    }

    #[tokio::test]
    async fn failed_run_keeps_previous_snapshot_and_clears_flag() {
        let coordinator = coordinator(Duration::ZERO);
        coordinator.start_if_idle().await.unwrap();
        let published = coordinator.store.get("dwd-station-list").await.unwrap();

        coordinator.source.fail.store(true, Ordering::SeqCst);
        assert!(coordinator.start_if_idle().await.is_err());
        assert_eq!(coordinator.store.get("dwd-station-list").await.unwrap(), published);
        assert!(coordinator.store.acquire_flag("dwd-discovery-running").await.unwrap());
    }

    #[tokio::test]
    async fn bootstrap_only_runs_without_snapshot() {
        let coordinator = coordinator(Duration::ZERO);
        assert!(coordinator.read_snapshot().await.unwrap().is_none());
        assert_eq!(
            coordinator.bootstrap_if_missing().await.unwrap(),
            Some(DiscoveryOutcome::Published { stations: 1 })
        );
        assert_eq!(coordinator.bootstrap_if_missing().await.unwrap(), None);
        assert_eq!(coordinator.source.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_clears_flag() {
        let coordinator = coordinator(Duration::from_secs(60));
        let run = tokio::time::timeout(Duration::from_millis(20), coordinator.start_if_idle()).await;
        assert!(run.is_err());
        tokio::time::sleep(Duration::from_millis(1)).await;

        let flag = coordinator.store.get("dwd-discovery-running").await.unwrap();
        assert_eq!(flag.as_deref(), Some(FLAG_CLEAR));
    }

    #[tokio::test]
    async fn panicked_run_clears_flag() {
        let coordinator = Arc::new(DiscoveryCoordinator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(PanickingSource),
            &DwdConfig::default(),
        ));
        let task = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.start_if_idle().await }
        });
        assert!(task.await.unwrap_err().is_panic());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(coordinator.store.acquire_flag("dwd-discovery-running").await.unwrap());
        assert!(coordinator.read_snapshot().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_reruns_on_every_configured_tick() {
        let config = DwdConfig::builder()
            .discovery_interval(Duration::from_secs(60))
            .build();
        let coordinator = Arc::new(DiscoveryCoordinator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(CountingSource::new(Duration::ZERO)),
            &config,
        ));
        let handle = coordinator.clone().spawn_scheduler();
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(coordinator.source.runs.load(Ordering::SeqCst), 2);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(coordinator.source.runs.load(Ordering::SeqCst), 3);
        handle.abort();
    }
}
