use crate::stations::merge::merge;
use crate::types::station::Station;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Folds station records into one entry per station code.
///
/// Insertion order does not matter since [`merge`] is commutative.
#[derive(Debug, Default)]
pub struct StationRegistry {
    by_code: HashMap<String, Station>,
}

impl StationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, station: Station) {
        let merged = match self.by_code.remove(&station.id) {
            Some(existing) => merge(&existing, &station),
            None => station,
        };
        self.by_code.insert(merged.id.clone(), merged);
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Settles each station's historical state against `today` and returns
    /// the stations ordered by code.
    pub fn finish(self, today: NaiveDate) -> Vec<Station> {
        let mut stations: Vec<Station> = self
            .by_code
            .into_values()
            .map(|mut station| {
                station.update_historical_state(today);
                station
            })
            .collect();
        stations.sort_by(|a, b| a.id.cmp(&b.id));
        stations
    }
}

impl Extend<Station> for StationRegistry {
    fn extend<I: IntoIterator<Item = Station>>(&mut self, iter: I) {
        for station in iter {
            self.insert(station);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::station_list::parse_station_list;
    use crate::types::granularity::Granularity;
    use crate::types::product::Product;
    use crate::types::timestamp::parse_timestamp;

    const LIST: &str = "Stations_id von_datum bis_datum Stationshoehe geoBreite geoLaenge Stationsname Bundesland Abgabe
----------- --------- --------- ------------- --------- --------- ------------ ---------- ------
00001 19500101 20230101 50.0 52.1 7.6 EXAMPLE STATION NI x
";

    fn fold(today: NaiveDate) -> Vec<Station> {
        let mut registry = StationRegistry::new();
        registry.extend(
            parse_station_list(LIST)
                .unwrap()
                .into_iter()
                .map(|row| row.into_station(Product::AirTemperature, Granularity::Hourly)),
        );
        registry.finish(today)
    }

    #[test]
    fn single_row_yields_one_historical_station() {
        let stations = fold(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(stations.len(), 1);
        let station = &stations[0];
        assert_eq!(station.id, "00001");
        assert_eq!(station.capabilities.len(), 1);
        let capability = station
            .capability(Product::AirTemperature, Granularity::Hourly)
            .unwrap();
        assert_eq!(capability.available_from, parse_timestamp("19500101").unwrap());
        assert_eq!(capability.available_until, parse_timestamp("20230101").unwrap());
        assert!(station.historical);
    }

    #[test]
    fn station_reporting_today_is_active() {
        let stations = fold(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert!(!stations[0].historical);
    }

    #[test]
    fn repeated_codes_fold_into_one_station() {
        let rows = parse_station_list(LIST).unwrap();
        let mut registry = StationRegistry::new();
        registry.insert(rows[0].clone().into_station(Product::AirTemperature, Granularity::Hourly));
        registry.insert(rows[0].clone().into_station(Product::Precipitation, Granularity::Daily));
        registry.insert(rows[0].clone().into_station(Product::AirTemperature, Granularity::Hourly));
        assert_eq!(registry.len(), 1);
        let stations = registry.finish(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(stations[0].capabilities.len(), 2);
    }
}
