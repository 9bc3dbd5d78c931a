//! Defines the data structures representing observation stations, their
//! location and the (product, granularity) windows they report data for.
//! Also includes implementations necessary for spatial indexing using the
//! `rstar` crate.

use crate::types::date_range::DateTimeRange;
use crate::types::granularity::{Granularity, GranularitySet};
use crate::types::product::{Product, ProductSet};
use chrono::{DateTime, FixedOffset, NaiveDate};
use rstar::{PointDistance, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Decimal places of the coordinate pair two stations must share to be
/// considered the same physical station.
const GEO_KEY_PRECISION: f64 = 10_000.0;

// --- Data Structures ---

/// Represents a single observation station and its declared data availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// The provider-assigned station code (e.g. "00001"). Stable and unique.
    pub id: String,
    /// Display name, e.g. "Aach".
    pub name: String,
    /// The federal state the station is located in, if listed.
    pub state: Option<String>,
    /// Elevation above sea level in meters.
    pub elevation: f64,
    /// Geographical location of the station.
    pub location: Location,
    /// `true` unless the station is still reporting today.
    pub historical: bool,
    /// One availability window per (product, granularity) pair.
    pub capabilities: Capabilities,
}

/// Represents the geographical location of a station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Height above sea level in meters, if known.
    pub height: Option<f64>,
}

/// A station's declared availability window for one (product, granularity) pair.
///
/// `available_from <= available_until` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    pub product: Product,
    pub granularity: Granularity,
    pub available_from: DateTime<FixedOffset>,
    pub available_until: DateTime<FixedOffset>,
}

impl Capability {
    /// Creates a capability, ordering the endpoints if they were given reversed.
    pub fn new(
        product: Product,
        granularity: Granularity,
        from: DateTime<FixedOffset>,
        until: DateTime<FixedOffset>,
    ) -> Self {
        let (available_from, available_until) = if from <= until {
            (from, until)
        } else {
            (until, from)
        };
        Self {
            product,
            granularity,
            available_from,
            available_until,
        }
    }

    /// Widens this window to the union with `other`. Never shrinks.
    pub fn widen(&mut self, other: &Capability) {
        if other.available_from < self.available_from {
            self.available_from = other.available_from;
        }
        if other.available_until > self.available_until {
            self.available_until = other.available_until;
        }
    }

    pub fn window(&self) -> DateTimeRange {
        DateTimeRange::new(Some(self.available_from), Some(self.available_until))
    }

    /// Whether either endpoint falls on the given calendar date.
    pub fn touches(&self, date: NaiveDate) -> bool {
        self.available_from.date_naive() == date || self.available_until.date_naive() == date
    }

    fn key(&self) -> (Product, Granularity) {
        (self.product, self.granularity)
    }
}

/// The capability set of a station, holding at most one entry per
/// (product, granularity) pair. Inserting an overlapping entry widens the
/// existing window instead of duplicating it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Capability>", into = "Vec<Capability>")]
pub struct Capabilities(BTreeMap<(Product, Granularity), Capability>);

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0
            .entry(capability.key())
            .and_modify(|existing| existing.widen(&capability))
            .or_insert(capability);
    }

    pub fn get(&self, product: Product, granularity: Granularity) -> Option<&Capability> {
        self.0.get(&(product, granularity))
    }

    /// All windows of a product, ordered by granularity.
    pub fn for_product(&self, product: Product) -> impl Iterator<Item = &Capability> {
        self.0.values().filter(move |c| c.product == product)
    }

    pub fn products(&self) -> ProductSet {
        self.0.keys().map(|(product, _)| *product).collect()
    }

    pub fn granularities_for(&self, product: Product) -> GranularitySet {
        self.for_product(product).map(|c| c.granularity).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The union of both sets, windows of shared pairs widened.
    pub fn union(&self, other: &Capabilities) -> Capabilities {
        let mut merged = self.clone();
        for capability in other.iter() {
            merged.insert(*capability);
        }
        merged
    }
}

impl From<Vec<Capability>> for Capabilities {
    fn from(capabilities: Vec<Capability>) -> Self {
        capabilities.into_iter().collect()
    }
}

impl From<Capabilities> for Vec<Capability> {
    fn from(capabilities: Capabilities) -> Self {
        capabilities.0.into_values().collect()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Capabilities::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

/// Geographic identity of a station: its coordinate pair rounded to four decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeoKey {
    latitude: i64,
    longitude: i64,
}

impl From<&Location> for GeoKey {
    fn from(location: &Location) -> Self {
        Self {
            latitude: (location.latitude * GEO_KEY_PRECISION).round() as i64,
            longitude: (location.longitude * GEO_KEY_PRECISION).round() as i64,
        }
    }
}

impl Station {
    pub fn add_capability(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
    }

    pub fn capability(&self, product: Product, granularity: Granularity) -> Option<&Capability> {
        self.capabilities.get(product, granularity)
    }

    /// Recomputes [`Station::historical`]: a station is historical unless one
    /// of its windows starts or ends on `today`.
    pub fn update_historical_state(&mut self, today: NaiveDate) {
        self.historical = !self.capabilities.iter().any(|c| c.touches(today));
    }

    pub fn geo_key(&self) -> GeoKey {
        GeoKey::from(&self.location)
    }

    /// Renders the station as a GeoJSON feature with its products as properties.
    pub fn to_feature(&self) -> Value {
        let mut coordinates = vec![json!(self.location.longitude), json!(self.location.latitude)];
        if let Some(height) = self.location.height {
            coordinates.push(json!(height));
        }

        let mut products = Map::new();
        for capability in self.capabilities.iter() {
            let entry = products
                .entry(capability.product.name())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(granularities) = entry {
                granularities.insert(
                    capability.granularity.name().to_string(),
                    json!({
                        "availableFrom": capability.available_from.to_rfc3339(),
                        "availableUntil": capability.available_until.to_rfc3339(),
                    }),
                );
            }
        }

        json!({
            "type": "Feature",
            "id": self.id,
            "geometry": {
                "type": "Point",
                "coordinates": coordinates,
            },
            "properties": {
                "name": self.name,
                "state": self.state,
                "elevation": self.elevation,
                "historical": self.historical,
                "products": products,
            },
        })
    }
}

// --- R-Tree Implementations ---

impl RTreeObject for Station {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.latitude, self.location.longitude])
    }
}

impl PointDistance for Station {
    // Squared Euclidean distance in degrees; callers re-rank with haversine.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.location.latitude - point[0];
        let dy = self.location.longitude - point[1];
        dx * dx + dy * dy
    }
}
