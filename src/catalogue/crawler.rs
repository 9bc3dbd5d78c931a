//! Concurrent traversal of the `granularity/product/subfolder/file` index tree.
//!
//! Every level is fully collected before the next level starts. All requests of
//! a crawler and its clones share one limiter, so nested fan-outs never have
//! more than `max_concurrent_requests` requests in flight. The first error
//! aborts the crawl; whatever the other tasks of that level produced is dropped.

use crate::catalogue::downloader::{DownloadedFile, Downloader};
use crate::catalogue::error::CatalogueError;
use crate::catalogue::page::{fetch_index, IndexPage};
use crate::catalogue::station_list::read_station_list;
use crate::config::DwdConfig;
use crate::stations::registry::StationRegistry;
use crate::types::granularity::Granularity;
use crate::types::product::Product;
use crate::types::station::Station;
use chrono::Utc;
use futures_util::{stream, StreamExt, TryStreamExt};
use log::{debug, info};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

/// A product folder below one granularity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFolder {
    pub granularity: Granularity,
    pub product: Product,
    pub url: Url,
}

/// A station list together with the folder it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationListSource {
    pub granularity: Granularity,
    pub product: Product,
    pub url: Url,
}

/// Remote files relevant to one station of one product folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationFiles {
    /// Documents in the product root, e.g. `DESCRIPTION_obsgermany_climate_hourly_tu_en.pdf`.
    pub descriptions: Vec<Url>,
    /// ZIP archives in the sub-folders whose name references the station.
    pub archives: Vec<Url>,
}

#[derive(Debug, Clone)]
pub struct Crawler {
    client: Client,
    downloader: Downloader,
    station_list_suffix: String,
    concurrency: usize,
    permits: Arc<Semaphore>,
}

impl Crawler {
    pub fn new(config: &DwdConfig, client: Client, downloader: Downloader) -> Self {
        Self {
            client,
            downloader,
            station_list_suffix: config.station_list_suffix.clone(),
            concurrency: config.concurrency(),
            permits: Arc::new(Semaphore::new(config.concurrency())),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Crawls a whole database and folds every station list into a registry.
    pub async fn discover(&self, root: &Url) -> Result<Vec<Station>, CatalogueError> {
        info!("Discovering stations below {}", root);
        let granularities = self.granularity_folders(root).await?;
        debug!("Found {} granularity folders", granularities.len());

        let products = self
            .fan_out(granularities, |(granularity, url)| {
                self.product_folders(granularity, url)
            })
            .await?;
        debug!("Found {} product folders", products.len());

        self.discover_folders(products).await
    }

    /// Crawls a single `{granularity}/{product}/` folder.
    pub async fn discover_product(
        &self,
        root: &Url,
        granularity: Granularity,
        product: Product,
    ) -> Result<Vec<Station>, CatalogueError> {
        let url = product_url(root, granularity, product)?;
        self.discover_folders(vec![ProductFolder {
            granularity,
            product,
            url,
        }])
        .await
    }

    async fn discover_folders(
        &self,
        products: Vec<ProductFolder>,
    ) -> Result<Vec<Station>, CatalogueError> {
        let sub_folders = self
            .fan_out(products, |folder| self.sub_folders(folder))
            .await?;
        debug!("Found {} sub-folders", sub_folders.len());

        let lists = self
            .fan_out(sub_folders, |folder| self.station_lists(folder))
            .await?;
        debug!("Found {} station lists", lists.len());

        let stations = self
            .fan_out(lists, |source| self.read_stations(source))
            .await?;

        let mut registry = StationRegistry::new();
        registry.extend(stations);
        let stations = registry.finish(Utc::now().date_naive());
        info!("Discovered {} stations", stations.len());
        Ok(stations)
    }

    /// Lists the description documents and the station's archives of a product.
    pub async fn station_files(
        &self,
        root: &Url,
        granularity: Granularity,
        product: Product,
        station_id: &str,
    ) -> Result<StationFiles, CatalogueError> {
        let url = product_url(root, granularity, product)?;
        let page = self.index(&url).await?;

        let descriptions = page
            .files()
            .into_iter()
            .map(|file| page.join(file))
            .collect::<Result<Vec<_>, _>>()?;

        let folders = page
            .folders()
            .into_iter()
            .map(|folder| page.join(folder))
            .collect::<Result<Vec<_>, _>>()?;

        let archives = self
            .fan_out(folders, |folder| async move {
                let page = self.index(&folder).await?;
                page.files()
                    .into_iter()
                    .filter(|file| file.ends_with(".zip") && names_station(file, station_id))
                    .map(|file| page.join(file))
                    .collect::<Result<Vec<_>, _>>()
            })
            .await?;

        Ok(StationFiles {
            descriptions,
            archives,
        })
    }

    /// Downloads one file once a request slot is free.
    pub async fn download(&self, url: &Url) -> Result<DownloadedFile, CatalogueError> {
        let _permit = self.permits.acquire().await?;
        self.downloader.download(url.as_str()).await
    }

    /// Downloads every URL concurrently, failing on the first error.
    pub async fn download_all(&self, urls: Vec<Url>) -> Result<Vec<DownloadedFile>, CatalogueError> {
        self.fan_out(urls, |url| async move { Ok(vec![self.download(&url).await?]) })
            .await
    }

    async fn index(&self, url: &Url) -> Result<IndexPage, CatalogueError> {
        let _permit = self.permits.acquire().await?;
        fetch_index(&self.client, url).await
    }

    async fn granularity_folders(&self, root: &Url) -> Result<Vec<(Granularity, Url)>, CatalogueError> {
        let page = self.index(root).await?;
        known_folders(&page, Granularity::from_folder)
    }

    async fn product_folders(
        &self,
        granularity: Granularity,
        url: Url,
    ) -> Result<Vec<ProductFolder>, CatalogueError> {
        let page = self.index(&url).await?;
        Ok(known_folders(&page, Product::from_folder)?
            .into_iter()
            .map(|(product, url)| ProductFolder {
                granularity,
                product,
                url,
            })
            .collect())
    }

    async fn sub_folders(&self, folder: ProductFolder) -> Result<Vec<ProductFolder>, CatalogueError> {
        let page = self.index(&folder.url).await?;
        page.folders()
            .into_iter()
            .map(|sub| {
                Ok(ProductFolder {
                    url: page.join(sub)?,
                    ..folder.clone()
                })
            })
            .collect()
    }

    async fn station_lists(
        &self,
        folder: ProductFolder,
    ) -> Result<Vec<StationListSource>, CatalogueError> {
        let page = self.index(&folder.url).await?;
        page.files()
            .into_iter()
            .filter(|file| file.ends_with(&self.station_list_suffix))
            .map(|file| {
                Ok(StationListSource {
                    granularity: folder.granularity,
                    product: folder.product,
                    url: page.join(file)?,
                })
            })
            .collect()
    }

    async fn read_stations(&self, source: StationListSource) -> Result<Vec<Station>, CatalogueError> {
        let file = self.download(&source.url).await?;
        let rows = read_station_list(file.path()).await?;
        debug!("Read {} stations from {}", rows.len(), source.url);
        Ok(rows
            .into_iter()
            .map(|row| row.into_station(source.product, source.granularity))
            .collect())
    }

    /// Runs `task` for every item with bounded concurrency and flattens the results.
    async fn fan_out<T, U, F, Fut>(&self, items: Vec<T>, task: F) -> Result<Vec<U>, CatalogueError>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<Vec<U>, CatalogueError>>,
    {
        let nested: Vec<Vec<U>> = stream::iter(items)
            .map(task)
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;
        Ok(nested.into_iter().flatten().collect())
    }
}

pub fn product_url(root: &Url, granularity: Granularity, product: Product) -> Result<Url, CatalogueError> {
    let relative = format!("{}/{}/", granularity.path_segment(), product.path_segment());
    root.join(&relative)
        .map_err(|e| CatalogueError::InvalidUrl(relative, e))
}

fn known_folders<K>(
    page: &IndexPage,
    resolve: impl Fn(&str) -> Option<K>,
) -> Result<Vec<(K, Url)>, CatalogueError> {
    let mut known = Vec::new();
    for folder in page.folders() {
        match resolve(folder) {
            Some(key) => known.push((key, page.join(folder)?)),
            None => debug!("Skipping unknown folder {} in {}", folder, page.url()),
        }
    }
    Ok(known)
}

/// Whether one of the `_`/`.` separated parts of `file` is exactly the station id.
fn names_station(file: &str, station_id: &str) -> bool {
    file.split(['_', '.']).any(|part| part == station_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_names_match_whole_tokens_only() {
        assert!(names_station("stundenwerte_TU_00001_19500101_20111231_hist.zip", "00001"));
        assert!(names_station("stundenwerte_TU_00001_akt.zip", "00001"));
        assert!(!names_station("stundenwerte_TU_10001_akt.zip", "00001"));
        assert!(!names_station("stundenwerte_TU_000011_akt.zip", "00001"));
    }

    #[test]
    fn product_urls_use_folder_names() {
        let root = Url::parse("https://example.org/climate/").unwrap();
        assert_eq!(
            product_url(&root, Granularity::EveryTenMinutes, Product::SolarRadiation)
                .unwrap()
                .as_str(),
            "https://example.org/climate/10_minutes/solar/"
        );
    }

    #[test]
    fn unknown_folders_are_skipped() {
        let page = IndexPage::parse(
            Url::parse("https://example.org/climate/").unwrap(),
            r#"<a href="../">..</a><a href="hourly/">h</a><a href="weird/">w</a><a href="daily/">d</a>"#,
        );
        let known = known_folders(&page, Granularity::from_folder).unwrap();
        let granularities: Vec<_> = known.iter().map(|(g, _)| *g).collect();
        assert_eq!(granularities, vec![Granularity::Hourly, Granularity::Daily]);
        assert_eq!(known[0].1.as_str(), "https://example.org/climate/hourly/");
    }
}
