use std::convert::Infallible;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::geo::{distance_km, BoundingBox};
use crate::impact::{distance_factor, impact};
use crate::types::{Coordinate, Hazard, Waypoint};
use crate::wire::round_to;

/// Hard minimum recommended speed in km/h.
pub const SAFETY_FLOOR_KMH: i32 = 20;

/// Ceiling on the summed hazard impact, so the limit is never cut by more than 80%.
pub const MAX_TOTAL_IMPACT: f64 = 0.8;

/// Source of candidate hazards around a point.
///
/// Implementations may return hazards outside `radius_km` (e.g. a
/// bounding-box query); the engine measures real distances itself. Errors are
/// handed back to the caller untouched.
pub trait HazardLookup {
    type Error;

    fn hazards_near(&self, center: Coordinate, radius_km: f64) -> Result<Vec<Hazard>, Self::Error>;
}

impl<F, E> HazardLookup for F
where
    F: Fn(Coordinate, f64) -> Result<Vec<Hazard>, E>,
{
    type Error = E;

    fn hazards_near(&self, center: Coordinate, radius_km: f64) -> Result<Vec<Hazard>, E> {
        self(center, radius_km)
    }
}

/// Borrowed in-memory hazard list, queried by bounding box.
#[derive(Debug, Clone, Copy)]
pub struct HazardSet<'a>(pub &'a [Hazard]);

impl HazardLookup for HazardSet<'_> {
    type Error = Infallible;

    fn hazards_near(&self, center: Coordinate, radius_km: f64) -> Result<Vec<Hazard>, Infallible> {
        let bbox = BoundingBox::around(center, radius_km);
        Ok(self
            .0
            .iter()
            .filter(|h| bbox.contains(h.coordinate()))
            .cloned()
            .collect())
    }
}

/// Recommended speed (km/h) at `point` given nearby hazards.
///
/// Impacts are summed, capped at [`MAX_TOTAL_IMPACT`], applied to the limit
/// and floored at [`SAFETY_FLOOR_KMH`]. The floor wins even when
/// `speed_limit` itself is below it.
pub fn recommend(point: Coordinate, speed_limit: i32, hazards: &[Hazard]) -> i32 {
    let total_impact: f64 = hazards
        .iter()
        .filter_map(|hazard| {
            let d = distance_km(point, hazard.coordinate());
            (distance_factor(d) > 0.0).then(|| impact(hazard.severity_level, d))
        })
        .sum();
    let total_impact = total_impact.min(MAX_TOTAL_IMPACT);

    let recommended = (f64::from(speed_limit) * (1.0 - total_impact)).floor() as i32;
    recommended.max(SAFETY_FLOOR_KMH)
}

/// A hazard found within the search radius of a waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedHazard {
    pub hazard: Hazard,
    pub distance_km: f64,
}

impl Serialize for MatchedHazard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MatchedHazard", 6)?;
        s.serialize_field("id", &self.hazard.id)?;
        s.serialize_field("type", &self.hazard.hazard_type)?;
        s.serialize_field("severity", &self.hazard.severity_level)?;
        s.serialize_field("distance_km", &round_to(self.distance_km, 2))?;
        s.serialize_field("road_name", &self.hazard.road_name)?;
        s.serialize_field("recommended_speed", &self.hazard.recommended_speed)?;
        s.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyStatus {
    Safe,
    Caution,
    Danger,
}

/// Speed advice for one waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedRecommendation {
    pub waypoint_index: usize,
    pub location: Coordinate,
    pub speed_limit: i32,
    pub recommended_speed: i32,
    pub speed_reduction: i32,
    /// Sorted by ascending distance
    pub matched_hazards: Vec<MatchedHazard>,
}

impl Serialize for SpeedRecommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("SpeedRecommendation", 7)?;
        s.serialize_field("waypoint_index", &self.waypoint_index)?;
        s.serialize_field("location", &self.location)?;
        s.serialize_field("speed_limit", &self.speed_limit)?;
        s.serialize_field("recommended_speed", &self.recommended_speed)?;
        s.serialize_field("speed_reduction", &self.speed_reduction)?;
        // always the length of `hazards`
        s.serialize_field("hazards_count", &self.hazards_count())?;
        s.serialize_field("hazards", &self.matched_hazards)?;
        s.end()
    }
}

impl SpeedRecommendation {
    /// Score `candidates` against one point.
    ///
    /// The speed uses every candidate (the impact curve already ignores
    /// anything past 2 km); only those within `search_radius_km` are listed.
    pub fn evaluate(
        waypoint_index: usize,
        location: Coordinate,
        speed_limit: i32,
        candidates: Vec<Hazard>,
        search_radius_km: f64,
    ) -> Self {
        let recommended_speed = recommend(location, speed_limit, &candidates);

        let mut matched_hazards: Vec<MatchedHazard> = candidates
            .into_iter()
            .filter_map(|hazard| {
                let distance_km = distance_km(location, hazard.coordinate());
                (distance_km <= search_radius_km).then_some(MatchedHazard { hazard, distance_km })
            })
            .collect();
        matched_hazards.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        Self {
            waypoint_index,
            location,
            speed_limit,
            recommended_speed,
            speed_reduction: speed_limit - recommended_speed,
            matched_hazards,
        }
    }

    /// Hazards listed within the search radius.
    pub fn hazards_count(&self) -> usize {
        self.matched_hazards.len()
    }

    pub fn safety_status(&self) -> SafetyStatus {
        if self.matched_hazards.is_empty() {
            SafetyStatus::Safe
        } else if f64::from(self.recommended_speed) > f64::from(self.speed_limit) * 0.8 {
            SafetyStatus::Caution
        } else {
            SafetyStatus::Danger
        }
    }
}

/// Recommendation for a single location, looked up through `lookup`.
///
/// # Arguments
/// * `point` - Where the vehicle is
/// * `speed_limit` - Posted limit (km/h) at that point
/// * `lookup` - Hazard source; its error is returned as-is
/// * `search_radius_km` - Radius (km) within which hazards are listed
pub fn recommend_at<L>(
    point: Coordinate,
    speed_limit: i32,
    lookup: &L,
    search_radius_km: f64,
) -> Result<SpeedRecommendation, L::Error>
where
    L: HazardLookup + ?Sized,
{
    let candidates = lookup.hazards_near(point, search_radius_km)?;
    Ok(SpeedRecommendation::evaluate(
        0,
        point,
        speed_limit,
        candidates,
        search_radius_km,
    ))
}

/// One recommendation per waypoint, in route order. A waypoint's explicit
/// `sequence` is used as its index, otherwise its position in the slice.
pub fn recommend_route<L>(
    waypoints: &[Waypoint],
    lookup: &L,
    search_radius_km: f64,
) -> Result<Vec<SpeedRecommendation>, L::Error>
where
    L: HazardLookup + ?Sized,
{
    waypoints
        .iter()
        .enumerate()
        .map(|(i, wp)| {
            let candidates = lookup.hazards_near(wp.coordinate, search_radius_km)?;
            let rec = SpeedRecommendation::evaluate(
                wp.sequence.unwrap_or(i),
                wp.coordinate,
                wp.speed_limit,
                candidates,
                search_radius_km,
            );
            tracing::debug!(
                "waypoint {} at {}: limit={} recommended={} hazards={}",
                rec.waypoint_index,
                rec.location,
                rec.speed_limit,
                rec.recommended_speed,
                rec.hazards_count()
            );
            Ok(rec)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HazardType, Severity};

    const ORIGIN: Coordinate = Coordinate::new(34.0151, 71.5249);

    // ~0.1112 km per 0.001 degree of latitude
    fn hazard_north(id: u64, severity: Severity, dlat: f64) -> Hazard {
        Hazard {
            id,
            latitude: ORIGIN.lat + dlat,
            longitude: ORIGIN.lng,
            hazard_type: HazardType::Pothole,
            severity_level: severity,
            detection_timestamp: 0,
            confidence_score: 0.8,
            image_path: None,
            speed_limit: 80,
            recommended_speed: 40,
            verified: false,
            road_name: "GT Road".to_string(),
            area: "Cantonment".to_string(),
            weather_condition: None,
        }
    }

    #[test]
    fn test_single_high_hazard_close() {
        let hazards = vec![hazard_north(1, Severity::High, 0.00045)]; // ~50 m
        assert_eq!(recommend(ORIGIN, 80, &hazards), 40);
    }

    #[test]
    fn test_empty_hazards_keeps_limit() {
        assert_eq!(recommend(ORIGIN, 80, &[]), 80);
        assert_eq!(recommend(ORIGIN, 20, &[]), 20);
        // floor dominates pathologically low limits
        assert_eq!(recommend(ORIGIN, 10, &[]), 20);
    }

    #[test]
    fn test_total_impact_is_capped() {
        let hazards = vec![
            hazard_north(1, Severity::High, 0.0),
            hazard_north(2, Severity::High, 0.0001),
            hazard_north(3, Severity::Medium, 0.0002),
        ];
        let expected = (f64::from(150) * (1.0 - MAX_TOTAL_IMPACT)).floor() as i32;
        assert_eq!(recommend(ORIGIN, 150, &hazards), expected);
        assert!((29..=30).contains(&expected));
        assert_eq!(recommend(ORIGIN, 80, &hazards), SAFETY_FLOOR_KMH);
    }

    #[test]
    fn test_far_hazards_ignored() {
        let hazards = vec![hazard_north(1, Severity::High, 0.05)]; // ~5.5 km
        assert_eq!(recommend(ORIGIN, 60, &hazards), 60);
    }

    #[test]
    fn test_bounds_hold_for_many_limits() {
        let hazards: Vec<Hazard> = (0..12)
            .map(|i| {
                let severity = Severity::ALL[i % 3];
                hazard_north(i as u64, severity, 0.0015 * i as f64)
            })
            .collect();
        for limit in 20..=130 {
            for n in 0..=hazards.len() {
                let r = recommend(ORIGIN, limit, &hazards[..n]);
                assert!((SAFETY_FLOOR_KMH..=limit).contains(&r), "limit {limit}, {n} hazards -> {r}");
            }
        }
    }

    #[test]
    fn test_evaluate_filters_and_sorts() {
        let candidates = vec![
            hazard_north(1, Severity::Low, 0.008),   // ~0.89 km
            hazard_north(2, Severity::High, 0.012),  // ~1.33 km, outside radius
            hazard_north(3, Severity::Medium, 0.001), // ~0.11 km
        ];
        let rec = SpeedRecommendation::evaluate(4, ORIGIN, 60, candidates.clone(), 1.0);

        assert_eq!(rec.waypoint_index, 4);
        assert_eq!(rec.hazards_count(), 2);
        let ids: Vec<u64> = rec.matched_hazards.iter().map(|m| m.hazard.id).collect();
        assert_eq!(ids, vec![3, 1]);
        // the out-of-radius hazard still weighs on the speed
        assert_eq!(rec.recommended_speed, recommend(ORIGIN, 60, &candidates));
        assert!(rec.recommended_speed < recommend(ORIGIN, 60, &candidates[..1]));
        assert_eq!(rec.speed_reduction, 60 - rec.recommended_speed);
    }

    #[test]
    fn test_safety_status() {
        let none = SpeedRecommendation::evaluate(0, ORIGIN, 60, vec![], 1.0);
        assert_eq!(none.safety_status(), SafetyStatus::Safe);

        let mild = SpeedRecommendation::evaluate(
            0,
            ORIGIN,
            60,
            vec![hazard_north(1, Severity::Low, 0.008)],
            1.0,
        );
        assert_eq!(mild.safety_status(), SafetyStatus::Caution);

        let severe = SpeedRecommendation::evaluate(
            0,
            ORIGIN,
            60,
            vec![hazard_north(1, Severity::High, 0.0)],
            1.0,
        );
        assert_eq!(severe.safety_status(), SafetyStatus::Danger);
    }

    #[test]
    fn test_wire_shape() {
        let rec = SpeedRecommendation::evaluate(
            0,
            ORIGIN,
            80,
            vec![hazard_north(9, Severity::High, 0.00045)],
            1.0,
        );
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["waypoint_index"], 0);
        assert_eq!(v["location"]["lat"], 34.0151);
        assert_eq!(v["location"]["lng"], 71.5249);
        assert_eq!(v["speed_limit"], 80);
        assert_eq!(v["recommended_speed"], 40);
        assert_eq!(v["speed_reduction"], 40);
        assert_eq!(v["hazards_count"], 1);
        assert_eq!(v["hazards"][0]["id"], 9);
        assert_eq!(v["hazards"][0]["type"], "pothole");
        assert_eq!(v["hazards"][0]["severity"], "high");
        assert_eq!(v["hazards"][0]["distance_km"], 0.05);
        assert_eq!(v["hazards"][0]["road_name"], "GT Road");
        // unrounded internally
        assert!(rec.matched_hazards[0].distance_km != 0.05);
    }

    #[test]
    fn test_hazards_count_follows_list() {
        let mut rec = SpeedRecommendation::evaluate(
            0,
            ORIGIN,
            80,
            vec![
                hazard_north(1, Severity::High, 0.0),
                hazard_north(2, Severity::Low, 0.003),
            ],
            1.0,
        );
        assert_eq!(rec.hazards_count(), 2);

        rec.matched_hazards.truncate(1);
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["hazards_count"], 1);
        assert_eq!(v["hazards"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_closure_lookup_error_propagates() {
        let failing = |_: Coordinate, _: f64| -> Result<Vec<Hazard>, String> {
            Err("database unavailable".to_string())
        };
        let err = recommend_at(ORIGIN, 60, &failing, 1.0).unwrap_err();
        assert_eq!(err, "database unavailable");

        let waypoints = [Waypoint::new(ORIGIN, 60)];
        assert!(recommend_route(&waypoints, &failing, 1.0).is_err());
    }

    #[test]
    fn test_hazard_set_lookup() {
        let hazards = vec![
            hazard_north(1, Severity::High, 0.002),
            hazard_north(2, Severity::High, 0.5),
        ];
        let found = HazardSet(&hazards).hazards_near(ORIGIN, 1.0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[test]
    fn test_route_uses_sequence_when_present() {
        let hazards = vec![hazard_north(1, Severity::Medium, 0.0)];
        let mut second = Waypoint::new(Coordinate::new(34.02, 71.53), 50);
        second.sequence = Some(7);
        let recs =
            recommend_route(&[Waypoint::new(ORIGIN, 60), second], &HazardSet(&hazards), 1.0).unwrap();
        assert_eq!(recs[0].waypoint_index, 0);
        assert_eq!(recs[1].waypoint_index, 7);
        assert_eq!(recs[0].recommended_speed, 45);
    }
}
