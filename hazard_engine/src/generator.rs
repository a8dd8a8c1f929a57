//! Synthetic hazard reports around Peshawar's road network.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::HazardError;
use crate::types::{Coordinate, Hazard, HazardType, Severity};
use crate::wire::now_ms;

/// Ordered `(variant, cumulative_weight)` pairs sampled with one uniform draw.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTable<T> {
    entries: Vec<(T, f64)>,
}

impl<T: Copy> WeightedTable<T> {
    /// Build from per-variant weights, in the given order.
    pub fn new(weights: &[(T, f64)]) -> Result<Self, HazardError> {
        if weights.is_empty() {
            return Err(HazardError::InvalidWeights("no variants"));
        }
        if weights
            .iter()
            .any(|&(_, weight)| !weight.is_finite() || weight < 0.0)
        {
            return Err(HazardError::InvalidWeights("weights must be finite and non-negative"));
        }
        Ok(Self {
            entries: cumulative(weights),
        })
    }

    /// First variant whose cumulative weight reaches `draw`; the first
    /// variant if the draw lies past the total.
    pub fn pick(&self, draw: f64) -> T {
        self.entries
            .iter()
            .find(|(_, cumulative)| draw <= *cumulative)
            .unwrap_or(&self.entries[0])
            .0
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.pick(rng.gen::<f64>())
    }

    pub fn entries(&self) -> &[(T, f64)] {
        &self.entries
    }
}

pub const HAZARD_TYPE_WEIGHTS: [(HazardType, f64); 5] = [
    (HazardType::Pothole, 0.45),
    (HazardType::Crack, 0.25),
    (HazardType::Debris, 0.15),
    (HazardType::Construction, 0.10),
    (HazardType::Flooding, 0.05),
];

pub const SEVERITY_WEIGHTS: [(Severity, f64); 3] = [
    (Severity::Low, 0.60),
    (Severity::Medium, 0.30),
    (Severity::High, 0.10),
];

#[derive(Debug, Clone, Copy)]
pub struct RoadProfile {
    pub name: &'static str,
    pub area: &'static str,
    pub speed_limit: i32,
    pub vertices: &'static [(f64, f64)],
}

pub const MAJOR_ROADS: [RoadProfile; 8] = [
    RoadProfile {
        name: "GT Road",
        area: "Cantonment",
        speed_limit: 80,
        vertices: &[(34.0151, 71.5249), (34.0089, 71.5456), (34.0023, 71.5678)],
    },
    RoadProfile {
        name: "University Road",
        area: "University Town",
        speed_limit: 60,
        vertices: &[(34.0151, 71.5249), (34.0198, 71.5156), (34.0245, 71.5089)],
    },
    RoadProfile {
        name: "Ring Road",
        area: "Hayatabad",
        speed_limit: 80,
        vertices: &[(33.9889, 71.4756), (33.9945, 71.4689), (34.0012, 71.4623)],
    },
    RoadProfile {
        name: "Jamrud Road",
        area: "Board Bazaar",
        speed_limit: 50,
        vertices: &[(34.0151, 71.5249), (34.0089, 71.5356), (34.0023, 71.5478)],
    },
    RoadProfile {
        name: "Peshawar Road",
        area: "Saddar",
        speed_limit: 40,
        vertices: &[(34.0151, 71.5249), (34.0198, 71.5356), (34.0245, 71.5478)],
    },
    RoadProfile {
        name: "Charsadda Road",
        area: "Charsadda",
        speed_limit: 60,
        vertices: &[(34.0312, 71.5234), (34.0378, 71.5156), (34.0445, 71.5089)],
    },
    RoadProfile {
        name: "Kohat Road",
        area: "Kohat",
        speed_limit: 70,
        vertices: &[(34.0089, 71.5456), (34.0023, 71.5578), (33.9956, 71.5689)],
    },
    RoadProfile {
        name: "Warsak Road",
        area: "Warsak",
        speed_limit: 50,
        vertices: &[(34.0456, 71.5123), (34.0523, 71.5056), (34.0589, 71.4989)],
    },
];

/// City bounds: (lat_min, lat_max, lng_min, lng_max)
pub const CITY_BOUNDS: (f64, f64, f64, f64) = (33.9, 34.1, 71.4, 71.7);

const ROAD_JITTER_DEG: f64 = 0.001;
const NEAR_ROAD_SHARE: f64 = 0.7;
const LOCAL_SPEED_LIMITS: [i32; 4] = [30, 40, 50, 60];
const WEATHER_CONDITIONS: [&str; 10] = [
    "Clear",
    "Partly Cloudy",
    "Cloudy",
    "Light Rain",
    "Heavy Rain",
    "Dust Storm",
    "Foggy",
    "Hot",
    "Mild",
    "Cold",
];

/// Per-report advisory speed stored with a generated hazard. Each severity
/// has its own floor.
pub fn hazard_recommended_speed(speed_limit: i32, severity: Severity) -> i32 {
    let limit = f64::from(speed_limit);
    match severity {
        Severity::High => ((limit * 0.5) as i32).max(20),
        Severity::Medium => ((limit * 0.75) as i32).max(25),
        Severity::Low => ((limit * 0.90) as i32).max(30),
    }
}

fn area_for(at: Coordinate) -> &'static str {
    if at.lat > 34.02 {
        "University Town"
    } else if at.lat < 33.95 {
        "Hayatabad"
    } else if at.lng > 71.6 {
        "Board Bazaar"
    } else {
        "Cantonment"
    }
}

pub struct HazardGenerator<R = ChaCha8Rng> {
    rng: R,
    types: WeightedTable<HazardType>,
    severities: WeightedTable<Severity>,
    next_id: u64,
}

impl HazardGenerator<ChaCha8Rng> {
    pub fn new() -> Self {
        Self::with_rng(ChaCha8Rng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl Default for HazardGenerator<ChaCha8Rng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> HazardGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            types: WeightedTable {
                entries: cumulative(&HAZARD_TYPE_WEIGHTS),
            },
            severities: WeightedTable {
                entries: cumulative(&SEVERITY_WEIGHTS),
            },
            next_id: 1,
        }
    }

    /// Ids continue from this value.
    pub fn starting_at(mut self, next_id: u64) -> Self {
        self.next_id = next_id;
        self
    }

    /// Generate a batch of synthetic hazard reports.
    ///
    /// The first 70% are jittered by up to 0.001 degrees around major-road
    /// vertices and carry that road's name, area and limit; the rest are
    /// scattered uniformly over the city bounds on local roads.
    ///
    /// # Arguments
    /// * `count` - Number of hazards to produce
    ///
    /// # Returns
    /// Hazards with consecutive ids starting at the generator's next id
    pub fn generate(&mut self, count: usize) -> Vec<Hazard> {
        let near_road = (count as f64 * NEAR_ROAD_SHARE) as usize;
        let mut hazards = Vec::with_capacity(count);
        for _ in 0..near_road {
            let hazard = self.near_road_hazard();
            hazards.push(hazard);
        }
        for _ in near_road..count {
            let hazard = self.scattered_hazard();
            hazards.push(hazard);
        }
        tracing::info!("generated {} hazards ({} near major roads)", hazards.len(), near_road);
        hazards
    }

    fn near_road_hazard(&mut self) -> Hazard {
        let road = MAJOR_ROADS
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(MAJOR_ROADS[0]);
        let &(lat, lng) = road.vertices.choose(&mut self.rng).unwrap_or(&road.vertices[0]);
        let at = Coordinate::new(
            lat + self.rng.gen_range(-ROAD_JITTER_DEG..=ROAD_JITTER_DEG),
            lng + self.rng.gen_range(-ROAD_JITTER_DEG..=ROAD_JITTER_DEG),
        );
        let confidence = self.rng.gen_range(0.7..0.95);
        let verified = self.rng.gen::<f64>() > 0.3 && self.rng.gen_bool(0.5);
        self.build(at, road.speed_limit, road.name.to_string(), road.area, confidence, verified)
    }

    fn scattered_hazard(&mut self) -> Hazard {
        let (lat_min, lat_max, lng_min, lng_max) = CITY_BOUNDS;
        let at = Coordinate::new(
            self.rng.gen_range(lat_min..lat_max),
            self.rng.gen_range(lng_min..lng_max),
        );
        let speed_limit = *LOCAL_SPEED_LIMITS.choose(&mut self.rng).unwrap_or(&50);
        let confidence = self.rng.gen_range(0.6..0.9);
        let verified = self.rng.gen::<f64>() > 0.4 && self.rng.gen_bool(0.5);
        let road_name = format!("Local Road {}", self.rng.gen_range(1..=100));
        self.build(at, speed_limit, road_name, area_for(at), confidence, verified)
    }

    fn build(
        &mut self,
        at: Coordinate,
        speed_limit: i32,
        road_name: String,
        area: &str,
        confidence_score: f64,
        verified: bool,
    ) -> Hazard {
        let hazard_type = self.types.sample(&mut self.rng);
        let severity_level = self.severities.sample(&mut self.rng);
        let age_minutes: i64 = self.rng.gen_range(0..=30) * 24 * 60
            + self.rng.gen_range(0..=23) * 60
            + self.rng.gen_range(0..=59);
        let weather = WEATHER_CONDITIONS.choose(&mut self.rng).copied().unwrap_or("Clear");

        let id = self.next_id;
        self.next_id += 1;

        Hazard {
            id,
            latitude: at.lat,
            longitude: at.lng,
            hazard_type,
            severity_level,
            detection_timestamp: now_ms() - age_minutes * 60_000,
            confidence_score,
            image_path: None,
            speed_limit,
            recommended_speed: hazard_recommended_speed(speed_limit, severity_level),
            verified,
            road_name,
            area: area.to_string(),
            weather_condition: Some(weather.to_string()),
        }
    }
}

fn cumulative<T: Copy>(weights: &[(T, f64)]) -> Vec<(T, f64)> {
    weights
        .iter()
        .scan(0.0, |acc, &(variant, weight)| {
            *acc += weight;
            Some((variant, *acc))
        })
        .collect()
}
