use crate::stations::error::LocateStationError;
use crate::types::date_range::DateTimeRange;
use crate::types::granularity::Granularity;
use crate::types::product::Product;
use crate::types::station::Station;
use haversine::{distance, Location as HaversineLocation, Units};
use ordered_float::OrderedFloat;
use rstar::RTree;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Spatial index over a station snapshot.
#[derive(Debug, Clone)]
pub struct StationLocator {
    rtree: RTree<Station>,
}

/// Restricts a nearest-station query to stations offering one
/// (product, granularity) pair, optionally over a whole time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityFilter {
    pub product: Product,
    pub granularity: Granularity,
    /// Both bounds that are set must lie inside the station's window.
    pub window: Option<DateTimeRange>,
}

// Helper struct for BinaryHeap ordering
struct StationCandidate<'a> {
    distance_km: OrderedFloat<f64>,
    station: &'a Station,
}
// Only the distance takes part in the ordering
impl PartialEq for StationCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.distance_km == other.distance_km
    }
}
impl Eq for StationCandidate<'_> {}
impl PartialOrd for StationCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for StationCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_km.cmp(&other.distance_km)
    }
}

fn haversine_km(latitude: f64, longitude: f64, station: &Station) -> f64 {
    distance(
        HaversineLocation {
            latitude,
            longitude,
        },
        HaversineLocation {
            latitude: station.location.latitude,
            longitude: station.location.longitude,
        },
        Units::Kilometers,
    )
}

impl StationLocator {
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            rtree: RTree::bulk_load(stations),
        }
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Like [`Self::query`], rejecting coordinates off the globe and unusable radii.
    pub fn checked_query(
        &self,
        latitude: f64,
        longitude: f64,
        n_results: usize,
        max_distance_km: f64,
        filter: Option<CapabilityFilter>,
    ) -> Result<Vec<(Station, f64)>, LocateStationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocateStationError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }
        if !max_distance_km.is_finite() || max_distance_km < 0.0 {
            return Err(LocateStationError::InvalidRadius(max_distance_km));
        }
        Ok(self.query(latitude, longitude, n_results, max_distance_km, filter))
    }

    /// Finds up to N nearest stations within `max_distance_km`, closest first. Uses a fast
    /// path for plain proximity queries and a heap for filtered ones.
    pub fn query(
        &self,
        latitude: f64,
        longitude: f64,
        n_results: usize,
        max_distance_km: f64,
        filter: Option<CapabilityFilter>,
    ) -> Vec<(Station, f64)> {
        if n_results == 0 {
            return vec![];
        }

        match filter {
            None => self.fast_proximity_query(latitude, longitude, n_results, max_distance_km),
            Some(filter) => {
                self.filtered_heap_query(latitude, longitude, n_results, max_distance_km, &filter)
            }
        }
    }

    /// Nearest stations without capability filters. Limits R-tree iteration and
    /// performs fewer Haversine calculations.
    fn fast_proximity_query(
        &self,
        latitude: f64,
        longitude: f64,
        n_results: usize,
        max_distance_km: f64,
    ) -> Vec<(Station, f64)> {
        // Degree distance and great-circle distance rank slightly differently,
        // so over-fetch before re-ranking.
        let candidate_limit = (n_results * 2).max(20);

        let mut stations_with_dist: Vec<(Station, f64)> = self
            .rtree
            .nearest_neighbor_iter(&[latitude, longitude])
            .take(candidate_limit)
            .filter_map(|station| {
                let dist_km = haversine_km(latitude, longitude, station);
                (dist_km <= max_distance_km).then(|| (station.to_owned(), dist_km))
            })
            .collect();

        stations_with_dist.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        stations_with_dist.truncate(n_results);
        stations_with_dist
    }

    fn filtered_heap_query(
        &self,
        latitude: f64,
        longitude: f64,
        n_results: usize,
        max_distance_km: f64,
        filter: &CapabilityFilter,
    ) -> Vec<(Station, f64)> {
        let mut heap: BinaryHeap<StationCandidate<'_>> = BinaryHeap::with_capacity(n_results);

        // Once the heap is full, keep looking this many matches further for a
        // closer great-circle hit before giving up.
        let iteration_limit = n_results * 2 + 10;
        let mut matches_checked = 0;

        for station in self.rtree.nearest_neighbor_iter(&[latitude, longitude]) {
            if !Self::station_meets_criteria(station, filter) {
                continue;
            }
            matches_checked += 1;

            let dist_km = haversine_km(latitude, longitude, station);
            if dist_km > max_distance_km * 2.0 {
                // Everything further along the tree is out of range too.
                break;
            }
            if dist_km > max_distance_km {
                continue;
            }

            let candidate = StationCandidate {
                distance_km: OrderedFloat(dist_km),
                station,
            };
            if heap.len() < n_results {
                heap.push(candidate);
            } else if heap
                .peek()
                .is_some_and(|worst| candidate.distance_km < worst.distance_km)
            {
                heap.pop();
                heap.push(candidate);
            }

            if matches_checked >= iteration_limit && heap.len() == n_results {
                break;
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| (c.station.to_owned(), c.distance_km.into_inner()))
            .collect()
    }

    fn station_meets_criteria(station: &Station, filter: &CapabilityFilter) -> bool {
        let Some(capability) = station.capability(filter.product, filter.granularity) else {
            return false;
        };
        match filter.window {
            None => true,
            Some(window) => {
                let available = capability.window();
                window.start.map_or(true, |start| available.contains(&start))
                    && window.end.map_or(true, |end| available.contains(&end))
            }
        }
    }
}
