pub mod datapoint;
pub mod date_range;
pub mod enum_set;
pub mod granularity;
pub mod product;
pub mod quality_flag;
pub mod station;
pub mod timestamp;
