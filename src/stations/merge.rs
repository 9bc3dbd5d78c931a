//! Reconciliation of station records describing the same physical station.

use crate::types::station::{GeoKey, Station};
use ordered_float::OrderedFloat;
use std::collections::HashMap;

/// Merges two records of the same station.
///
/// Capability windows are unioned; the station stays historical only if both
/// records are. Descriptive fields come from whichever record sorts first by
/// (id, name, state, elevation, location), so the result does not depend on
/// argument order and merging a station with itself returns it unchanged.
pub fn merge(a: &Station, b: &Station) -> Station {
    let (preferred, other) = if precedence(a) <= precedence(b) {
        (a, b)
    } else {
        (b, a)
    };
    Station {
        capabilities: preferred.capabilities.union(&other.capabilities),
        historical: preferred.historical && other.historical,
        ..preferred.clone()
    }
}

type Precedence<'a> = (
    &'a str,
    &'a str,
    Option<&'a str>,
    OrderedFloat<f64>,
    OrderedFloat<f64>,
    OrderedFloat<f64>,
    Option<OrderedFloat<f64>>,
);

fn precedence(station: &Station) -> Precedence<'_> {
    (
        station.id.as_str(),
        station.name.as_str(),
        station.state.as_deref(),
        OrderedFloat(station.elevation),
        OrderedFloat(station.location.latitude),
        OrderedFloat(station.location.longitude),
        station.location.height.map(OrderedFloat),
    )
}

/// Collapses stations sharing a [`GeoKey`] into one, ordered by id.
pub fn merge_by_location(stations: impl IntoIterator<Item = Station>) -> Vec<Station> {
    let mut by_location: HashMap<GeoKey, Station> = HashMap::new();
    for station in stations {
        let key = station.geo_key();
        let merged = match by_location.remove(&key) {
            Some(existing) => merge(&existing, &station),
            None => station,
        };
        by_location.insert(key, merged);
    }
    let mut merged: Vec<Station> = by_location.into_values().collect();
    merged.sort_by(|a, b| a.id.cmp(&b.id));
    merged
}
