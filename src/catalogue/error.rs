use crate::types::timestamp::TimestampError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid URL '{0}'")]
    InvalidUrl(String, #[source] url::ParseError),

    #[error("Failed to create temporary file in '{0}'")]
    TempFile(PathBuf, #[source] std::io::Error),

    #[error("Failed to store download of {0}")]
    DownloadIo(String, #[source] std::io::Error),

    #[error("Failed to read station list '{0}'")]
    StationListRead(PathBuf, #[source] std::io::Error),

    #[error("Malformed station list row {line}: {reason}")]
    StationListFormat { line: usize, reason: String },

    #[error("Invalid date in station list row {line}")]
    StationListDate {
        line: usize,
        #[source]
        source: TimestampError,
    },

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Request limiter was closed")]
    LimiterClosed(#[from] tokio::sync::AcquireError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
