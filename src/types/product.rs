//! Defines the observed phenomenon categories ("products" or "data types") and
//! which of them are published for each [`Granularity`].

use crate::types::enum_set::EnumSet;
use crate::types::granularity::Granularity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named observed phenomenon category published on the open data server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Product {
    AirTemperature,
    ClimateIndices,
    Cloudiness,
    CloudType,
    DewPoint,
    ExtremeTemperature,
    ExtremeWind,
    Moisture,
    MorePhenomena,
    MorePrecipitation,
    MoreWeatherPhenomena,
    Precipitation,
    Pressure,
    Soil,
    SoilTemperature,
    SolarRadiation,
    StandardFormat,
    StationObservations,
    Sun,
    Visibility,
    WaterEquivalent,
    WeatherPhenomena,
    WindSpeeds,
    WindSynopsis,
    WindTest,
}

impl Product {
    pub const ALL: [Product; 25] = [
        Product::AirTemperature,
        Product::ClimateIndices,
        Product::Cloudiness,
        Product::CloudType,
        Product::DewPoint,
        Product::ExtremeTemperature,
        Product::ExtremeWind,
        Product::Moisture,
        Product::MorePhenomena,
        Product::MorePrecipitation,
        Product::MoreWeatherPhenomena,
        Product::Precipitation,
        Product::Pressure,
        Product::Soil,
        Product::SoilTemperature,
        Product::SolarRadiation,
        Product::StandardFormat,
        Product::StationObservations,
        Product::Sun,
        Product::Visibility,
        Product::WaterEquivalent,
        Product::WeatherPhenomena,
        Product::WindSpeeds,
        Product::WindSynopsis,
        Product::WindTest,
    ];

    /// The folder name of this product on the open data server.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Product::AirTemperature => "air_temperature",
            Product::ClimateIndices => "climate_indices",
            Product::Cloudiness => "cloudiness",
            Product::CloudType => "cloud_type",
            Product::DewPoint => "dew_point",
            Product::ExtremeTemperature => "extreme_temperature",
            Product::ExtremeWind => "extreme_wind",
            Product::Moisture => "moisture",
            Product::MorePhenomena => "more_phenomena",
            Product::MorePrecipitation => "more_precip",
            Product::MoreWeatherPhenomena => "more_weather_phenomena",
            Product::Precipitation => "precipitation",
            Product::Pressure => "pressure",
            Product::Soil => "soil",
            Product::SoilTemperature => "soil_temperature",
            Product::SolarRadiation => "solar",
            Product::StandardFormat => "standard_format",
            Product::StationObservations => "kl",
            Product::Sun => "sun",
            Product::Visibility => "visibility",
            Product::WaterEquivalent => "water_equiv",
            Product::WeatherPhenomena => "weather_phenomena",
            Product::WindSpeeds => "wind",
            Product::WindSynopsis => "wind_synop",
            Product::WindTest => "wind_test",
        }
    }

    /// The camel-cased name used in serialized output.
    pub fn name(&self) -> &'static str {
        match self {
            Product::AirTemperature => "airTemperature",
            Product::ClimateIndices => "climateIndices",
            Product::Cloudiness => "cloudiness",
            Product::CloudType => "cloudType",
            Product::DewPoint => "dewPoint",
            Product::ExtremeTemperature => "extremeTemperature",
            Product::ExtremeWind => "extremeWind",
            Product::Moisture => "moisture",
            Product::MorePhenomena => "morePhenomena",
            Product::MorePrecipitation => "morePrecipitation",
            Product::MoreWeatherPhenomena => "moreWeatherPhenomena",
            Product::Precipitation => "precipitation",
            Product::Pressure => "pressure",
            Product::Soil => "soil",
            Product::SoilTemperature => "soilTemperature",
            Product::SolarRadiation => "solarRadiation",
            Product::StandardFormat => "standardFormat",
            Product::StationObservations => "stationObservations",
            Product::Sun => "sun",
            Product::Visibility => "visibility",
            Product::WaterEquivalent => "waterEquivalent",
            Product::WeatherPhenomena => "weatherPhenomena",
            Product::WindSpeeds => "windSpeeds",
            Product::WindSynopsis => "windSynopsis",
            Product::WindTest => "windTest",
        }
    }

    /// Resolves a directory-index folder link (e.g. `"air_temperature/"`) to a product.
    pub fn from_folder(folder: &str) -> Option<Self> {
        folder.trim_end_matches('/').parse().ok()
    }

    /// Whether the server publishes this product in the given granularity.
    pub fn is_available_in(&self, granularity: Granularity) -> bool {
        products_for(granularity).contains(self)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown product '{0}'")]
pub struct UnknownProduct(pub String);

impl FromStr for Product {
    type Err = UnknownProduct;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Product::ALL
            .into_iter()
            .find(|p| p.path_segment() == s || p.name() == s)
            .ok_or_else(|| UnknownProduct(s.to_string()))
    }
}

pub type ProductSet = EnumSet<Product>;

/// The climate observation products published for a granularity.
pub fn products_for(granularity: Granularity) -> &'static [Product] {
    use Product::*;
    match granularity {
        Granularity::EveryMinute | Granularity::EveryFiveMinutes => &[Precipitation],
        Granularity::EveryTenMinutes => &[
            AirTemperature,
            ExtremeTemperature,
            ExtremeWind,
            Precipitation,
            SolarRadiation,
            WindSpeeds,
        ],
        Granularity::Hourly => &[
            AirTemperature,
            CloudType,
            Cloudiness,
            DewPoint,
            ExtremeWind,
            Moisture,
            Precipitation,
            Pressure,
            SoilTemperature,
            SolarRadiation,
            Sun,
            Visibility,
            WeatherPhenomena,
            WindSpeeds,
            WindSynopsis,
        ],
        Granularity::SubDaily => &[
            AirTemperature,
            Cloudiness,
            ExtremeWind,
            Moisture,
            Pressure,
            Soil,
            Visibility,
            WindSpeeds,
        ],
        Granularity::Daily => &[
            StationObservations,
            MorePrecipitation,
            MoreWeatherPhenomena,
            SoilTemperature,
            SolarRadiation,
            WaterEquivalent,
            WeatherPhenomena,
        ],
        Granularity::Monthly | Granularity::Annual => &[
            StationObservations,
            ClimateIndices,
            MorePrecipitation,
            WeatherPhenomena,
        ],
        Granularity::MultiAnnual => &[],
    }
}

/// Every (granularity, product) pair published on the server.
pub fn supported_pairs() -> impl Iterator<Item = (Granularity, Product)> {
    Granularity::ALL
        .into_iter()
        .flat_map(|g| products_for(g).iter().map(move |p| (g, *p)))
}
