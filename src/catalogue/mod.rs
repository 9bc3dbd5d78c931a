pub mod crawler;
pub mod downloader;
pub mod error;
pub mod page;
pub mod station_list;
