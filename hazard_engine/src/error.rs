use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HazardError {
    #[error("latitude {0} outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0} outside [-180, 180]")]
    InvalidLongitude(f64),
    #[error("route needs at least one waypoint")]
    EmptyRoute,
    #[error("speed {0} km/h must be finite and positive")]
    InvalidSpeed(f64),
    #[error("invalid weight table: {0}")]
    InvalidWeights(&'static str),
}
