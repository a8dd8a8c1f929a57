use serde::{Deserialize, Serialize};

use crate::error::HazardError;

/// A WGS-84 position in decimal degrees.
///
/// Ranges are not enforced by the plain constructor; callers that take
/// coordinates from the outside go through [`Coordinate::try_new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validating constructor: latitude in [-90, 90], longitude in [-180, 180].
    pub fn try_new(lat: f64, lng: f64) -> Result<Self, HazardError> {
        Self::new(lat, lng).validated()
    }

    pub fn validated(self) -> Result<Self, HazardError> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(HazardError::InvalidLatitude(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(HazardError::InvalidLongitude(self.lng));
        }
        Ok(self)
    }

    /// Linear interpolation in degree space, `t` in [0, 1].
    pub fn lerp(self, to: Coordinate, t: f64) -> Self {
        Self {
            lat: self.lat + (to.lat - self.lat) * t,
            lng: self.lng + (to.lng - self.lng) * t,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardType {
    Pothole,
    Crack,
    Debris,
    Construction,
    Flooding,
}

impl HazardType {
    pub const ALL: [HazardType; 5] = [
        HazardType::Pothole,
        HazardType::Crack,
        HazardType::Debris,
        HazardType::Construction,
        HazardType::Flooding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HazardType::Pothole => "pothole",
            HazardType::Crack => "crack",
            HazardType::Debris => "debris",
            HazardType::Construction => "construction",
            HazardType::Flooding => "flooding",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// A stored road-hazard report. The engine only ever reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub hazard_type: HazardType,
    pub severity_level: Severity,
    /// Detection time, ms since the Unix epoch
    pub detection_timestamp: i64,
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub image_path: Option<String>,
    pub speed_limit: i32,
    pub recommended_speed: i32,
    #[serde(default)]
    pub verified: bool,
    pub road_name: String,
    pub area: String,
    #[serde(default)]
    pub weather_condition: Option<String>,
}

impl Hazard {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

pub const DEFAULT_SPEED_LIMIT: i32 = 50;

fn default_speed_limit() -> i32 {
    DEFAULT_SPEED_LIMIT
}

/// A route point with its local speed limit (km/h).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(default = "default_speed_limit")]
    pub speed_limit: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<usize>,
}

impl Waypoint {
    pub fn new(coordinate: Coordinate, speed_limit: i32) -> Self {
        Self {
            coordinate,
            speed_limit,
            sequence: None,
        }
    }
}
