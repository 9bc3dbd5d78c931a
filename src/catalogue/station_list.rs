//! Parser for the whitespace-aligned station description lists.
//!
//! The first line names the columns, the second is a dashed separator. Each
//! following row reads
//! `id from until height latitude longitude name... state [fee]`, where the
//! name may span several tokens and the fee column only exists when the
//! header announces it.

use crate::archive::encoding::decode_windows_1252;
use crate::catalogue::error::CatalogueError;
use crate::types::granularity::Granularity;
use crate::types::product::Product;
use crate::types::station::{Capabilities, Capability, Location, Station};
use crate::types::timestamp::parse_timestamp;
use chrono::{DateTime, FixedOffset};
use std::path::Path;

const HEADER_LINES: usize = 2;
const FEE_HEADER: &str = "abgabe";
/// id, from, until, height, latitude, longitude
const LEADING_COLUMNS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct StationListRow {
    pub id: String,
    pub available_from: DateTime<FixedOffset>,
    pub available_until: DateTime<FixedOffset>,
    pub height: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub state: String,
}

impl StationListRow {
    /// A station carrying a single capability for the folder the list was found in.
    pub fn into_station(self, product: Product, granularity: Granularity) -> Station {
        let capability = Capability::new(
            product,
            granularity,
            self.available_from,
            self.available_until,
        );
        let mut capabilities = Capabilities::new();
        capabilities.insert(capability);
        Station {
            id: self.id,
            name: self.name,
            state: Some(self.state).filter(|s| !s.is_empty()),
            elevation: self.height,
            location: Location {
                longitude: self.longitude,
                latitude: self.latitude,
                height: Some(self.height),
            },
            historical: true,
            capabilities,
        }
    }
}

pub async fn read_station_list(path: &Path) -> Result<Vec<StationListRow>, CatalogueError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CatalogueError::StationListRead(path.to_path_buf(), e))?;
    parse_station_list(&decode_windows_1252(&bytes))
}

pub fn parse_station_list(text: &str) -> Result<Vec<StationListRow>, CatalogueError> {
    let has_fee = text
        .lines()
        .next()
        .is_some_and(|header| header.to_lowercase().contains(FEE_HEADER));
    let trailing = if has_fee { 2 } else { 1 };

    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate().skip(HEADER_LINES) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let line_number = index + 1;
        if tokens.len() < LEADING_COLUMNS + 1 + trailing {
            return Err(CatalogueError::StationListFormat {
                line: line_number,
                reason: format!("expected at least {} columns, found {}", LEADING_COLUMNS + 1 + trailing, tokens.len()),
            });
        }

        let state_index = tokens.len() - trailing;
        let date = |raw: &str| {
            parse_timestamp(raw).map_err(|source| CatalogueError::StationListDate {
                line: line_number,
                source,
            })
        };
        let number = |raw: &str, column: &str| {
            raw.parse::<f64>().map_err(|e| CatalogueError::StationListFormat {
                line: line_number,
                reason: format!("invalid {column} '{raw}': {e}"),
            })
        };

        rows.push(StationListRow {
            id: tokens[0].to_string(),
            available_from: date(tokens[1])?,
            available_until: date(tokens[2])?,
            height: number(tokens[3], "height")?,
            latitude: number(tokens[4], "latitude")?,
            longitude: number(tokens[5], "longitude")?,
            name: tokens[LEADING_COLUMNS..state_index].join(" "),
            state: tokens[state_index].to_string(),
        });
    }
    Ok(rows)
}
