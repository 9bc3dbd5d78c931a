use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocateStationError {
    #[error("Coordinates ({latitude}, {longitude}) are outside the valid range")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Search radius {0} km must be a finite, non-negative distance")]
    InvalidRadius(f64),
}
