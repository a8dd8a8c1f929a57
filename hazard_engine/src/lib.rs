//! Speed advice around road hazards.
//!
//! Given a position, its speed limit and the hazards reported nearby, the
//! engine computes a safe speed; the route analyzer rolls those up into a
//! trip-level risk verdict. The simulators and generator produce synthetic
//! tracks and hazard reports for demos and tests.

pub mod engine;
pub mod error;
pub mod generator;
pub mod geo;
pub mod impact;
pub mod route;
pub mod simulator;
pub mod types;
mod wire;

pub use engine::{
    recommend, recommend_at, recommend_route, HazardLookup, HazardSet, MatchedHazard,
    SafetyStatus, SpeedRecommendation, MAX_TOTAL_IMPACT, SAFETY_FLOOR_KMH,
};
pub use error::HazardError;
pub use generator::{HazardGenerator, WeightedTable};
pub use geo::{distance_km, BoundingBox};
pub use route::{analyze, RouteSafetyReport, SafetyLevel};
pub use simulator::{GpsFix, GpsSimulator, RouteSimulator};
pub use types::{Coordinate, Hazard, HazardType, Severity, Waypoint, DEFAULT_SPEED_LIMIT};
pub use wire::now_ms;
