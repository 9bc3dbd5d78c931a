use crate::catalogue::error::CatalogueError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Shared store request failed")]
    Redis(#[from] redis::RedisError),

    #[error("Shared store connection failed for '{0}'")]
    Connection(String, #[source] redis::RedisError),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Catalogue(#[from] CatalogueError),

    #[error("Unknown database '{0}'")]
    UnknownDatabase(String),

    #[error("Failed to encode station snapshot")]
    SnapshotEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to decode station snapshot")]
    SnapshotDecode(#[source] Box<bincode::error::DecodeError>),

    #[error("Snapshot compression failed")]
    SnapshotCompression(#[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
