pub mod error;
pub mod locate_station;
pub mod merge;
pub mod registry;
