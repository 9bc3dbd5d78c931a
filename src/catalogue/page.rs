//! Fetching of directory-index pages and classification of their links.

use crate::catalogue::error::CatalogueError;
use log::warn;
use reqwest::{Client, Response, StatusCode};
use scraper::{Html, Node};
use std::collections::HashSet;
use url::Url;

const PARENT_LINK: &str = "../";

/// The anchors of one directory-index page, in document order without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    url: Url,
    links: Vec<String>,
}

impl IndexPage {
    /// Parses an index document served at `url`.
    ///
    /// Only relative links are kept: sort links (`?C=N;O=D`), fragments,
    /// host-absolute and fully qualified URLs never denote a child entry.
    pub fn parse(url: Url, html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        // Explicit stack so adversarially deep documents cannot exhaust the call stack.
        let mut stack = vec![document.tree.root()];
        while let Some(node) = stack.pop() {
            if let Node::Element(element) = node.value() {
                if element.name() == "a" {
                    if let Some(href) = element.attr("href").map(str::trim) {
                        if is_child_link(href) && seen.insert(href.to_string()) {
                            links.push(href.to_string());
                        }
                    }
                }
            }
            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }

        Self { url, links }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Links ending in `/`, excluding the parent reference.
    pub fn folders(&self) -> Vec<&str> {
        self.links
            .iter()
            .map(String::as_str)
            .filter(|link| link.ends_with('/') && *link != PARENT_LINK)
            .collect()
    }

    /// Non-empty links not ending in `/`.
    pub fn files(&self) -> Vec<&str> {
        self.links
            .iter()
            .map(String::as_str)
            .filter(|link| !link.is_empty() && !link.ends_with('/'))
            .collect()
    }

    /// Resolves a link of this page to an absolute URL.
    pub fn join(&self, link: &str) -> Result<Url, CatalogueError> {
        self.url
            .join(link)
            .map_err(|e| CatalogueError::InvalidUrl(link.to_string(), e))
    }
}

fn is_child_link(href: &str) -> bool {
    !(href.starts_with('?')
        || href.starts_with('#')
        || href.starts_with('/')
        || href.contains("://"))
}

/// Parses a directory URL, adding the trailing slash relative joins depend on.
pub fn directory_url(raw: &str) -> Result<Url, CatalogueError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| CatalogueError::InvalidUrl(raw.to_string(), e))
}

/// Sends a GET request and turns non-success statuses into errors.
pub(crate) async fn send_checked(client: &Client, url: &str) -> Result<Response, CatalogueError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CatalogueError::NetworkRequest(url.to_string(), e))?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(CatalogueError::NotFound {
            url: url.to_string(),
        });
    }

    match response.error_for_status() {
        Ok(resp) => Ok(resp),
        Err(e) => {
            warn!("HTTP error for {}: {:?}", url, e);
            Err(if let Some(status) = e.status() {
                CatalogueError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                }
            } else {
                CatalogueError::NetworkRequest(url.to_string(), e)
            })
        }
    }
}

/// Fetches and parses the directory index at `url`.
pub async fn fetch_index(client: &Client, url: &Url) -> Result<IndexPage, CatalogueError> {
    let response = send_checked(client, url.as_str()).await?;
    let body = response
        .text()
        .await
        .map_err(|e| CatalogueError::NetworkRequest(url.to_string(), e))?;
    Ok(IndexPage::parse(url.clone(), &body))
}
