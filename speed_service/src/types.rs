use hazard_engine::{
    Coordinate, Hazard, HazardType, RouteSafetyReport, SafetyStatus, Severity,
    SpeedRecommendation, Waypoint,
};
use serde::{Deserialize, Serialize};

// ---------- Hazard CRUD ----------

#[derive(Deserialize, Debug)]
pub struct NewHazard {
    pub latitude: f64,
    pub longitude: f64,
    pub hazard_type: HazardType,
    pub severity_level: Severity,
    /// ms since epoch, defaults to now
    pub detection_timestamp: Option<i64>,
    #[serde(default)]
    pub confidence_score: f64,
    pub image_path: Option<String>,
    pub speed_limit: i32,
    pub recommended_speed: i32,
    #[serde(default)]
    pub verified: bool,
    pub road_name: String,
    pub area: String,
    pub weather_condition: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct HazardUpdate {
    pub verified: Option<bool>,
    pub severity_level: Option<Severity>,
    pub recommended_speed: Option<i32>,
    pub weather_condition: Option<String>,
}

fn default_hours_back() -> i64 {
    24
}

#[derive(Deserialize, Debug)]
pub struct HazardQuery {
    pub north: Option<f64>,
    pub south: Option<f64>,
    pub east: Option<f64>,
    pub west: Option<f64>,
    pub hazard_type: Option<HazardType>,
    pub severity_level: Option<Severity>,
    /// 0 disables the age filter
    #[serde(default = "default_hours_back")]
    pub hours_back: i64,
    #[serde(default)]
    pub verified_only: bool,
}

impl Default for HazardQuery {
    fn default() -> Self {
        Self {
            north: None,
            south: None,
            east: None,
            west: None,
            hazard_type: None,
            severity_level: None,
            hours_back: default_hours_back(),
            verified_only: false,
        }
    }
}

#[derive(Serialize)]
pub struct HazardList {
    pub hazards: Vec<Hazard>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct HazardEnvelope {
    pub message: &'static str,
    pub hazard: Hazard,
}

#[derive(Deserialize, Debug)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
}

#[derive(Serialize)]
pub struct NearbyResponse {
    pub hazards: Vec<Hazard>,
    pub center: Coordinate,
    pub radius_km: f64,
    pub count: usize,
}

#[derive(Deserialize, Debug)]
pub struct RouteHazardsRequest {
    pub waypoints: Vec<Coordinate>,
    pub buffer_km: Option<f64>,
}

#[derive(Serialize)]
pub struct RouteInfo {
    pub waypoints_count: usize,
    pub buffer_km: f64,
    pub hazards_found: usize,
}

#[derive(Serialize)]
pub struct RouteHazardsResponse {
    pub hazards: Vec<Hazard>,
    pub route_info: RouteInfo,
}

// ---------- Speed advice ----------

#[derive(Deserialize, Debug)]
pub struct SpeedRequest {
    pub waypoints: Vec<Waypoint>,
    pub search_radius_km: Option<f64>,
}

#[derive(Serialize)]
pub struct SpeedRecommendationsResponse {
    pub recommendations: Vec<SpeedRecommendation>,
    pub search_radius_km: f64,
    pub total_waypoints: usize,
}

#[derive(Deserialize, Debug)]
pub struct LocationQuery {
    pub lat: f64,
    pub lng: f64,
    pub speed_limit: Option<i32>,
    pub radius_km: Option<f64>,
}

#[derive(Serialize)]
pub struct LocationResponse {
    #[serde(flatten)]
    pub recommendation: SpeedRecommendation,
    pub safety_status: SafetyStatus,
}

#[derive(Serialize)]
pub struct RouteAnalysisResponse {
    pub route_analysis: RouteSafetyReport,
    pub detailed_recommendations: Vec<SpeedRecommendation>,
}

// ---------- Simulation stream ----------

#[derive(Deserialize, Debug)]
pub struct SimulationRequest {
    pub waypoints: Vec<Waypoint>,
    pub speed_kmh: Option<f64>,
}

#[derive(Serialize)]
pub struct SimulationFrame {
    pub tick: u32,
    pub waypoint_index: usize,
    pub progress: f64,
    pub finished: bool,
    pub fix: hazard_engine::GpsFix,
    pub recommendation: SpeedRecommendation,
}
