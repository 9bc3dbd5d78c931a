use crate::types::timestamp::TimestampError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to open archive '{0}'")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("Failed to read ZIP structure")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to read archive entry '{entry}'")]
    EntryRead {
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in archive entry '{entry}'")]
    Csv {
        entry: String,
        #[source]
        source: csv::Error,
    },

    #[error("Archive entry '{entry}' lacks the required column '{column}'")]
    MissingColumn { entry: String, column: &'static str },

    #[error("Row {row} of archive entry '{entry}' has {found} columns, {required} required")]
    ShortRow {
        entry: String,
        row: usize,
        found: usize,
        required: usize,
    },

    #[error("Invalid date in archive entry '{entry}', row {row}")]
    Timestamp {
        entry: String,
        row: usize,
        #[source]
        source: TimestampError,
    },

    #[error("Invalid gap boundary '{value}' in archive entry '{entry}', row {row}")]
    GapBoundary {
        entry: String,
        row: usize,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid missing value count '{value}' in archive entry '{entry}', row {row}")]
    GapCount {
        entry: String,
        row: usize,
        value: String,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
