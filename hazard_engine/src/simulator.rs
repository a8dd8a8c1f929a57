//! Synthetic GPS tracks for demos and tests.
//!
//! Motion uses a flat-Earth step of 111 320 m per degree, and the heading is
//! applied as `cos` to latitude and `sin` to longitude. Both are kept as-is;
//! consumers of the generated tracks rely on this convention.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::error::HazardError;
use crate::geo::distance_km;
use crate::types::Coordinate;
use crate::wire::{now_ms, round_to};

/// Meters per degree at the equator
pub const METERS_PER_DEGREE: f64 = 111_320.0;

pub const MIN_SPEED_KMH: f64 = 20.0;
pub const MAX_SPEED_KMH: f64 = 80.0;

const TURN_PROBABILITY: f64 = 0.10;
const MAX_TURN_DEG: f64 = 30.0;
const SPEED_CHANGE_PROBABILITY: f64 = 0.05;
const MAX_SPEED_CHANGE_KMH: f64 = 10.0;
const ACCURACY_RANGE_M: (f64, f64) = (3.0, 8.0);
const ALTITUDE_RANGE_M: (f64, f64) = (300.0, 600.0);

/// Named road boxes: (name, lat range, lng range).
const NAMED_ROADS: [(&str, (f64, f64), (f64, f64)); 4] = [
    ("University Road", (34.01, 34.02), (71.51, 71.53)),
    ("GT Road", (34.00, 34.01), (71.54, 71.57)),
    ("Ring Road", (33.98, 34.00), (71.47, 71.50)),
    ("Jamrud Road", (34.00, 34.01), (71.53, 71.55)),
];

/// Reverse-geocode against the fixed road table, falling back to a random
/// `Local Road N`.
pub fn road_name_at<R: Rng + ?Sized>(at: Coordinate, rng: &mut R) -> String {
    NAMED_ROADS
        .iter()
        .find(|(_, (lat_lo, lat_hi), (lng_lo, lng_hi))| {
            (*lat_lo..=*lat_hi).contains(&at.lat) && (*lng_lo..=*lng_hi).contains(&at.lng)
        })
        .map(|(name, _, _)| name.to_string())
        .unwrap_or_else(|| format!("Local Road {}", rng.gen_range(1..=100)))
}

/// One reported GPS reading, rounded for the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsFix {
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub heading: f64,
    pub accuracy: f64,
    pub altitude: f64,
    pub road_name: String,
}

impl GpsFix {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Free-roaming vehicle with random turns, speed changes and GPS noise.
///
/// Single-owner state; wrap it in a lock if it must cross threads.
#[derive(Debug, Clone)]
pub struct GpsSimulator<R = ChaCha8Rng> {
    position: Coordinate,
    heading_deg: f64,
    speed_kmh: f64,
    accuracy_m: f64,
    rng: R,
}

impl GpsSimulator<ChaCha8Rng> {
    pub fn new(start: Coordinate, speed_kmh: f64) -> Self {
        Self::with_rng(start, speed_kmh, ChaCha8Rng::from_entropy())
    }

    pub fn seeded(start: Coordinate, speed_kmh: f64, seed: u64) -> Self {
        Self::with_rng(start, speed_kmh, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> GpsSimulator<R> {
    /// Create a free-roaming track with a random heading and accuracy.
    ///
    /// # Arguments
    /// * `start` - Initial true position
    /// * `speed_kmh` - Initial speed, clamped into [20, 80] km/h
    /// * `rng` - Source for heading, turns, speed changes and noise
    pub fn with_rng(start: Coordinate, speed_kmh: f64, mut rng: R) -> Self {
        let heading_deg = rng.gen_range(0.0..360.0);
        let accuracy_m = rng.gen_range(ACCURACY_RANGE_M.0..=ACCURACY_RANGE_M.1);
        Self {
            position: start,
            heading_deg,
            speed_kmh: speed_kmh.clamp(MIN_SPEED_KMH, MAX_SPEED_KMH),
            accuracy_m,
            rng,
        }
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    pub fn accuracy_m(&self) -> f64 {
        self.accuracy_m
    }

    pub fn set_position(&mut self, position: Coordinate) {
        self.position = position;
    }

    /// Advance the free-motion model by `dt_seconds`.
    pub fn step(&mut self, dt_seconds: f64) {
        let distance_m = self.speed_kmh / 3.6 * dt_seconds;
        let distance_deg = distance_m / METERS_PER_DEGREE;
        let heading = self.heading_deg.to_radians();
        self.position = Coordinate::new(
            self.position.lat + distance_deg * heading.cos(),
            self.position.lng + distance_deg * heading.sin(),
        );

        if self.rng.gen_bool(TURN_PROBABILITY) {
            let delta = self.rng.gen_range(-MAX_TURN_DEG..=MAX_TURN_DEG);
            self.heading_deg = wrap_degrees(self.heading_deg + delta);
        }

        if self.rng.gen_bool(SPEED_CHANGE_PROBABILITY) {
            let delta = self.rng.gen_range(-MAX_SPEED_CHANGE_KMH..=MAX_SPEED_CHANGE_KMH);
            self.speed_kmh = (self.speed_kmh + delta).clamp(MIN_SPEED_KMH, MAX_SPEED_KMH);
        }

        self.accuracy_m = self.rng.gen_range(ACCURACY_RANGE_M.0..=ACCURACY_RANGE_M.1);
    }

    /// Current reading with fresh noise of up to `accuracy_m` on each axis.
    /// The noise is not stored.
    pub fn current_position(&mut self) -> GpsFix {
        let noise_deg = self.accuracy_m / METERS_PER_DEGREE;
        let noisy = Coordinate::new(
            self.position.lat + self.rng.gen_range(-noise_deg..=noise_deg),
            self.position.lng + self.rng.gen_range(-noise_deg..=noise_deg),
        );
        let altitude = self.rng.gen_range(ALTITUDE_RANGE_M.0..=ALTITUDE_RANGE_M.1);
        let road_name = road_name_at(noisy, &mut self.rng);

        GpsFix {
            timestamp: now_ms(),
            latitude: round_to(noisy.lat, 6),
            longitude: round_to(noisy.lng, 6),
            speed: round_to(self.speed_kmh, 1),
            heading: round_to(self.heading_deg, 1),
            accuracy: round_to(self.accuracy_m, 1),
            altitude,
            road_name,
        }
    }
}

fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negatives
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Follows a fixed list of waypoints by linear interpolation, then roams
/// freely once the last waypoint is reached.
#[derive(Debug, Clone)]
pub struct RouteSimulator<R = ChaCha8Rng> {
    waypoints: Vec<Coordinate>,
    current_waypoint_index: usize,
    /// Fraction of the current segment covered, always < 1
    progress: f64,
    /// Also the source of the route speed, so fixes report what is driven
    gps: GpsSimulator<R>,
}

impl RouteSimulator<ChaCha8Rng> {
    pub fn new(waypoints: Vec<Coordinate>, speed_kmh: f64) -> Result<Self, HazardError> {
        Self::with_rng(waypoints, speed_kmh, ChaCha8Rng::from_entropy())
    }

    pub fn seeded(waypoints: Vec<Coordinate>, speed_kmh: f64, seed: u64) -> Result<Self, HazardError> {
        Self::with_rng(waypoints, speed_kmh, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> RouteSimulator<R> {
    /// Create a route follower starting at the first waypoint.
    ///
    /// # Arguments
    /// * `waypoints` - Route vertices in driving order, at least one
    /// * `speed_kmh` - Cruise speed; must be positive, then clamped into [20, 80] km/h
    /// * `rng` - Source for heading, GPS noise and free-roaming motion
    ///
    /// # Returns
    /// `HazardError::EmptyRoute` for no waypoints, `HazardError::InvalidSpeed`
    /// for a non-finite or non-positive speed
    pub fn with_rng(waypoints: Vec<Coordinate>, speed_kmh: f64, rng: R) -> Result<Self, HazardError> {
        let start = *waypoints.first().ok_or(HazardError::EmptyRoute)?;
        if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
            return Err(HazardError::InvalidSpeed(speed_kmh));
        }
        Ok(Self {
            waypoints,
            current_waypoint_index: 0,
            progress: 0.0,
            gps: GpsSimulator::with_rng(start, speed_kmh, rng),
        })
    }

    /// Speed used on the route and reported in every fix.
    pub fn speed_kmh(&self) -> f64 {
        self.gps.speed_kmh()
    }

    pub fn current_waypoint_index(&self) -> usize {
        self.current_waypoint_index
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn waypoints(&self) -> &[Coordinate] {
        &self.waypoints
    }

    pub fn gps(&self) -> &GpsSimulator<R> {
        &self.gps
    }

    /// True once the last waypoint is reached and motion is free roaming.
    pub fn is_finished(&self) -> bool {
        self.current_waypoint_index + 1 >= self.waypoints.len()
    }

    /// Noise-free position along the route.
    pub fn route_position(&self) -> Coordinate {
        if self.is_finished() {
            return self.gps.position();
        }
        let from = self.waypoints[self.current_waypoint_index];
        let to = self.waypoints[self.current_waypoint_index + 1];
        from.lerp(to, self.progress)
    }

    pub fn current_position(&mut self) -> GpsFix {
        if !self.is_finished() {
            let at = self.route_position();
            self.gps.set_position(at);
        }
        self.gps.current_position()
    }

    /// Move `dt_seconds` along the current segment, or roam freely after the
    /// last waypoint.
    pub fn advance(&mut self, dt_seconds: f64) {
        if self.is_finished() {
            self.gps.step(dt_seconds);
            return;
        }

        let distance_m = self.gps.speed_kmh() / 3.6 * dt_seconds;
        let from = self.waypoints[self.current_waypoint_index];
        let to = self.waypoints[self.current_waypoint_index + 1];
        let segment_m = distance_km(from, to) * 1000.0;

        if segment_m > 0.0 {
            self.progress += distance_m / segment_m;
        } else {
            self.progress = 1.0;
        }

        if self.progress >= 1.0 {
            self.current_waypoint_index += 1;
            self.progress = 0.0;
            tracing::debug!(
                "reached waypoint {} of {}",
                self.current_waypoint_index,
                self.waypoints.len()
            );
            if self.is_finished() {
                self.gps.set_position(to);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PESHAWAR_ROUTE: [Coordinate; 4] = [
        Coordinate::new(34.0151, 71.5249),
        Coordinate::new(34.0089, 71.5456),
        Coordinate::new(34.0023, 71.5678),
        Coordinate::new(33.9889, 71.4756),
    ];

    #[test]
    fn test_speed_stays_in_band() {
        for seed in 0..20 {
            let mut gps = GpsSimulator::seeded(PESHAWAR_ROUTE[0], 75.0, seed);
            for _ in 0..2_000 {
                gps.step(1.0);
                let v = gps.speed_kmh();
                assert!((MIN_SPEED_KMH..=MAX_SPEED_KMH).contains(&v), "seed {seed}: {v}");
                assert!((0.0..360.0).contains(&gps.heading_deg()));
                assert!((3.0..=8.0).contains(&gps.accuracy_m()));
            }
        }
    }

    #[test]
    fn test_initial_speed_clamped() {
        assert_eq!(GpsSimulator::seeded(PESHAWAR_ROUTE[0], 150.0, 1).speed_kmh(), 80.0);
        assert_eq!(GpsSimulator::seeded(PESHAWAR_ROUTE[0], 5.0, 1).speed_kmh(), 20.0);
    }

    #[test]
    fn test_step_distance_matches_speed() {
        let mut gps = GpsSimulator::seeded(PESHAWAR_ROUTE[0], 72.0, 7);
        let heading = gps.heading_deg().to_radians();
        let before = gps.position();
        gps.step(10.0);
        let after = gps.position();

        // 72 km/h for 10 s = 200 m
        let expected_deg = 200.0 / METERS_PER_DEGREE;
        assert!((after.lat - before.lat - expected_deg * heading.cos()).abs() < 1e-12);
        assert!((after.lng - before.lng - expected_deg * heading.sin()).abs() < 1e-12);
    }

    #[test]
    fn test_noise_is_bounded_and_not_stored() {
        let mut gps = GpsSimulator::seeded(PESHAWAR_ROUTE[0], 50.0, 3);
        let truth = gps.position();
        let bound = gps.accuracy_m() / METERS_PER_DEGREE + 1e-6;
        let mut readings = Vec::new();
        for _ in 0..50 {
            let fix = gps.current_position();
            assert!((fix.latitude - truth.lat).abs() <= bound);
            assert!((fix.longitude - truth.lng).abs() <= bound);
            readings.push(fix.coordinate());
        }
        assert_eq!(gps.position(), truth);
        assert!(readings.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_road_names() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(road_name_at(Coordinate::new(34.015, 71.52), &mut rng), "University Road");
        assert_eq!(road_name_at(Coordinate::new(34.005, 71.56), &mut rng), "GT Road");
        assert_eq!(road_name_at(Coordinate::new(33.99, 71.48), &mut rng), "Ring Road");
        let local = road_name_at(Coordinate::new(0.0, 0.0), &mut rng);
        assert!(local.starts_with("Local Road "), "{local}");
    }

    #[test]
    fn test_empty_route_rejected() {
        assert_eq!(RouteSimulator::new(Vec::new(), 50.0).unwrap_err(), HazardError::EmptyRoute);
    }

    #[test]
    fn test_bad_route_speed_rejected() {
        let route = PESHAWAR_ROUTE[..2].to_vec();
        for speed in [-30.0, 0.0, f64::NAN, f64::INFINITY] {
            let err = RouteSimulator::seeded(route.clone(), speed, 1).unwrap_err();
            assert!(matches!(err, HazardError::InvalidSpeed(_)), "{speed}: {err:?}");
        }
    }

    #[test]
    fn test_route_distance_matches_reported_speed() {
        // 120 km/h is clamped, so the route must be driven at the reported 80
        let (a, b) = (PESHAWAR_ROUTE[0], PESHAWAR_ROUTE[1]);
        let segment_m = distance_km(a, b) * 1000.0;
        let mut sim = RouteSimulator::seeded(vec![a, b], 120.0, 1).unwrap();
        sim.advance(10.0);
        let fix = sim.current_position();

        let moved_m = sim.progress() * segment_m;
        let reported_m = fix.speed / 3.6 * 10.0;
        assert_eq!(fix.speed, 80.0);
        assert_eq!(sim.speed_kmh(), 80.0);
        assert!((moved_m - reported_m).abs() < 1e-6, "moved {moved_m} m, reported {reported_m} m");
        assert!(sim.progress() > 0.0 && sim.progress() < 1.0);
    }

    #[test]
    fn test_route_progress_and_advancement() {
        let mut sim = RouteSimulator::seeded(PESHAWAR_ROUTE.to_vec(), 60.0, 11).unwrap();
        let mut last_index = 0;
        let mut ticks = 0;
        while !sim.is_finished() {
            sim.advance(1.0);
            ticks += 1;
            assert!(sim.progress() < 1.0);
            assert!(sim.progress() >= 0.0);
            if sim.current_waypoint_index() != last_index {
                assert_eq!(sim.current_waypoint_index(), last_index + 1);
                assert_eq!(sim.progress(), 0.0);
                last_index = sim.current_waypoint_index();
            }
            assert!(ticks < 10_000, "route never finished");
        }
        assert_eq!(sim.current_waypoint_index(), PESHAWAR_ROUTE.len() - 1);
        assert_eq!(sim.gps().position(), PESHAWAR_ROUTE[3]);
        println!("✓ Route finished after {} ticks", ticks);
    }

    #[test]
    fn test_route_interpolates_between_waypoints() {
        let mut sim = RouteSimulator::seeded(PESHAWAR_ROUTE.to_vec(), 60.0, 5).unwrap();
        assert_eq!(sim.route_position(), PESHAWAR_ROUTE[0]);
        for _ in 0..30 {
            sim.advance(1.0);
        }
        let p = sim.route_position();
        let expected = PESHAWAR_ROUTE[0].lerp(PESHAWAR_ROUTE[1], sim.progress());
        assert_eq!(p, expected);
        // 500 m covered of a ~2 km segment
        assert!(sim.progress() > 0.2 && sim.progress() < 0.3, "{}", sim.progress());

        let fix = sim.current_position();
        assert_eq!(sim.gps().position(), p);
        assert!((fix.latitude - p.lat).abs() < 1e-3);
    }

    #[test]
    fn test_final_waypoint_delegates_to_free_motion() {
        let mut sim = RouteSimulator::seeded(vec![PESHAWAR_ROUTE[0]], 60.0, 9).unwrap();
        assert!(sim.is_finished());
        let before = sim.gps().position();
        sim.advance(5.0);
        assert_eq!(sim.current_waypoint_index(), 0);
        assert_eq!(sim.progress(), 0.0);
        assert_ne!(sim.gps().position(), before);
    }

    #[test]
    fn test_duplicate_waypoints_do_not_stall() {
        let wp = PESHAWAR_ROUTE[0];
        let mut sim = RouteSimulator::seeded(vec![wp, wp, PESHAWAR_ROUTE[1]], 60.0, 2).unwrap();
        sim.advance(0.0);
        assert_eq!(sim.current_waypoint_index(), 1);
        assert_eq!(sim.progress(), 0.0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut a = GpsSimulator::seeded(PESHAWAR_ROUTE[0], 50.0, 42);
        let mut b = GpsSimulator::seeded(PESHAWAR_ROUTE[0], 50.0, 42);
        for _ in 0..100 {
            a.step(1.0);
            b.step(1.0);
        }
        assert_eq!(a.position(), b.position());
        assert_eq!(a.speed_kmh(), b.speed_kmh());
    }
}
