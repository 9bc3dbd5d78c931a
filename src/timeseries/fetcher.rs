//! Per-request timeseries path: validate against the live station list of one
//! product folder, then download and parse only that station's archives.

use crate::archive::parser::{parse_archive_blocking, ParsedArchive};
use crate::catalogue::crawler::Crawler;
use crate::timeseries::description::describe;
use crate::timeseries::error::TimeseriesError;
use crate::types::datapoint::{DescriptionFile, Timeseries};
use crate::types::date_range::DateTimeRange;
use crate::types::granularity::Granularity;
use crate::types::product::Product;
use crate::types::station::Capability;
use futures_util::{stream, StreamExt, TryStreamExt};
use log::{debug, info};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeseriesQuery {
    pub product: Product,
    pub granularity: Granularity,
    pub station_id: String,
    pub range: DateTimeRange,
}

#[derive(Debug, Clone)]
pub struct TimeseriesFetcher {
    crawler: Crawler,
}

impl TimeseriesFetcher {
    pub fn new(crawler: Crawler) -> Self {
        Self { crawler }
    }

    pub async fn fetch(
        &self,
        root: &Url,
        query: &TimeseriesQuery,
    ) -> Result<Timeseries, TimeseriesError> {
        if !query.product.is_available_in(query.granularity) {
            return Err(TimeseriesError::UnsupportedProduct {
                product: query.product,
                granularity: query.granularity,
            });
        }

        let capability = self.capability_of(root, query).await?;
        validate_window(&capability, &query.range)?;

        let files = self
            .crawler
            .station_files(root, query.granularity, query.product, &query.station_id)
            .await?;
        info!(
            "Fetching {} archives and {} documents for station {}",
            files.archives.len(),
            files.descriptions.len(),
            query.station_id
        );

        let description_files: Vec<DescriptionFile> = stream::iter(files.descriptions)
            .map(|url| self.description(url))
            .buffered(self.crawler.concurrency())
            .try_collect()
            .await?;

        let archives = self.crawler.download_all(files.archives).await?;
        let parsed: Vec<ParsedArchive> = stream::iter(archives.iter())
            .map(|file| parse_archive_blocking(file.path().to_path_buf(), query.range))
            .buffered(self.crawler.concurrency())
            .try_collect()
            .await?;

        let mut series = Timeseries {
            description_files,
            ..Timeseries::default()
        };
        for archive in parsed {
            series.datapoints.extend(archive.datapoints);
            series.metadata.extend(archive.metadata);
        }
        series.datapoints.sort_by_key(|d| d.timestamp);
        debug!(
            "Station {} yielded {} datapoints",
            query.station_id,
            series.datapoints.len()
        );
        Ok(series)
    }

    /// The station's window for the queried pair, taken from the current
    /// station list of that product folder.
    async fn capability_of(
        &self,
        root: &Url,
        query: &TimeseriesQuery,
    ) -> Result<Capability, TimeseriesError> {
        let stations = self
            .crawler
            .discover_product(root, query.granularity, query.product)
            .await?;
        stations
            .iter()
            .find(|s| s.id == query.station_id)
            .and_then(|s| s.capability(query.product, query.granularity))
            .copied()
            .ok_or_else(|| TimeseriesError::StationNotAvailable {
                station: query.station_id.clone(),
                product: query.product,
                granularity: query.granularity,
            })
    }

    async fn description(&self, url: Url) -> Result<DescriptionFile, TimeseriesError> {
        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();
        let file = self.crawler.download(&url).await?;
        let content = tokio::fs::read(file.path())
            .await
            .map_err(|e| TimeseriesError::DescriptionRead(file.path().to_path_buf(), e))?;
        Ok(describe(&file_name, &content, file.content_type()))
    }
}

/// Rejects a requested window that is inverted or reaches outside the
/// station's declared availability. Open bounds always pass.
pub fn validate_window(capability: &Capability, range: &DateTimeRange) -> Result<(), TimeseriesError> {
    if let (true, Some(start), Some(end)) = (range.is_inverted(), range.start, range.end) {
        return Err(TimeseriesError::BoundariesSwitched { start, end });
    }
    if let Some(start) = range.start {
        if start < capability.available_from {
            return Err(TimeseriesError::StartTooEarly {
                requested: start,
                available_from: capability.available_from,
            });
        }
    }
    if let Some(end) = range.end {
        if end > capability.available_until {
            return Err(TimeseriesError::EndTooLate {
                requested: end,
                available_until: capability.available_until,
            });
        }
    }
    Ok(())
}
