pub mod coordinator;
pub mod error;
pub mod redis_store;
pub mod snapshot;
pub mod store;
