//! Route-level safety verdicts built from per-waypoint recommendations.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::{recommend_route, HazardLookup, SpeedRecommendation};
use crate::types::{HazardType, Severity, Waypoint};
use crate::wire::round1;

/// Extra travel minutes per km/h of summed speed reduction (rough estimate).
const MINUTES_PER_KMH_REDUCTION: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Safe,
    LowRisk,
    ModerateRisk,
    HighRisk,
}

impl SafetyLevel {
    pub fn classify(total_hazards: usize, average_speed_reduction: f64) -> Self {
        if total_hazards == 0 {
            SafetyLevel::Safe
        } else if average_speed_reduction <= 10.0 {
            SafetyLevel::LowRisk
        } else if average_speed_reduction <= 20.0 {
            SafetyLevel::ModerateRisk
        } else {
            SafetyLevel::HighRisk
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSafetyReport {
    pub total_waypoints: usize,
    pub total_hazards: usize,
    #[serde(serialize_with = "round1")]
    pub average_speed_reduction: f64,
    pub safety_level: SafetyLevel,
    #[serde(rename = "hazard_distribution")]
    pub hazard_type_histogram: BTreeMap<HazardType, usize>,
    /// Always holds every severity, zero counts included
    #[serde(rename = "severity_distribution")]
    pub severity_histogram: BTreeMap<Severity, usize>,
    pub most_dangerous_segment: Option<SpeedRecommendation>,
    #[serde(serialize_with = "round1")]
    pub estimated_extra_time_minutes: f64,
    /// Per-waypoint detail, serialized separately by callers
    #[serde(skip)]
    pub segments: Vec<SpeedRecommendation>,
}

impl RouteSafetyReport {
    /// Reduce per-waypoint recommendations to a route verdict.
    ///
    /// Hazards near several waypoints are counted once per waypoint.
    pub fn from_segments(segments: Vec<SpeedRecommendation>) -> Self {
        let total_hazards: usize = segments.iter().map(|s| s.hazards_count()).sum();
        let total_reduction: i64 = segments.iter().map(|s| i64::from(s.speed_reduction)).sum();
        let average_speed_reduction = if segments.is_empty() {
            0.0
        } else {
            total_reduction as f64 / segments.len() as f64
        };

        let mut hazard_type_histogram = BTreeMap::new();
        let mut severity_histogram: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|&s| (s, 0)).collect();
        for matched in segments.iter().flat_map(|s| &s.matched_hazards) {
            *hazard_type_histogram
                .entry(matched.hazard.hazard_type)
                .or_insert(0) += 1;
            *severity_histogram
                .entry(matched.hazard.severity_level)
                .or_insert(0) += 1;
        }

        // strictly greater keeps the first of equal reductions; explicit
        // sequence numbers may be out of order, so compare indices too
        let most_dangerous_segment = segments
            .iter()
            .fold(None::<&SpeedRecommendation>, |best, seg| match best {
                Some(b)
                    if b.speed_reduction > seg.speed_reduction
                        || (b.speed_reduction == seg.speed_reduction
                            && b.waypoint_index <= seg.waypoint_index) =>
                {
                    Some(b)
                }
                _ => Some(seg),
            })
            .cloned();

        Self {
            total_waypoints: segments.len(),
            total_hazards,
            average_speed_reduction,
            safety_level: SafetyLevel::classify(total_hazards, average_speed_reduction),
            hazard_type_histogram,
            severity_histogram,
            most_dangerous_segment,
            estimated_extra_time_minutes: total_reduction as f64 * MINUTES_PER_KMH_REDUCTION,
            segments,
        }
    }
}

/// Score every waypoint against hazards from `lookup` and summarize the route.
///
/// An empty route is not an error: it reports `safe` with nothing matched.
///
/// # Arguments
/// * `waypoints` - Route points with their speed limits, in driving order
/// * `lookup` - Hazard source queried once per waypoint
/// * `search_radius_km` - Radius (km) within which hazards are listed per waypoint
///
/// # Returns
/// The report with per-waypoint detail in `segments`, or the first lookup error
pub fn analyze<L>(
    waypoints: &[Waypoint],
    lookup: &L,
    search_radius_km: f64,
) -> Result<RouteSafetyReport, L::Error>
where
    L: HazardLookup + ?Sized,
{
    let segments = recommend_route(waypoints, lookup, search_radius_km)?;
    let report = RouteSafetyReport::from_segments(segments);
    tracing::info!(
        "route analysis: waypoints={} hazards={} avg_reduction={:.1} level={:?}",
        report.total_waypoints,
        report.total_hazards,
        report.average_speed_reduction,
        report.safety_level
    );
    Ok(report)
}
