//! Severity and distance weighting for a single hazard.

use crate::types::Severity;

/// Ascending `(max_distance_km, factor)` steps. A distance takes the factor
/// of the first threshold it does not exceed.
pub const DISTANCE_FACTORS: [(f64, f64); 5] = [
    (0.1, 1.0),
    (0.2, 0.8),
    (0.5, 0.5),
    (1.0, 0.2),
    (2.0, 0.1),
];

/// Fraction of the speed limit retained if this were the only hazard.
pub fn severity_factor(severity: Severity) -> f64 {
    match severity {
        Severity::High => 0.5,
        Severity::Medium => 0.75,
        Severity::Low => 0.90,
    }
}

/// Distance weighting, 0 beyond the last threshold.
pub fn distance_factor(distance_km: f64) -> f64 {
    DISTANCE_FACTORS
        .iter()
        .find(|(threshold, _)| distance_km <= *threshold)
        .map_or(0.0, |&(_, factor)| factor)
}

/// Contribution of one hazard to the total speed reduction, in [0, 0.5].
pub fn impact(severity: Severity, distance_km: f64) -> f64 {
    (1.0 - severity_factor(severity)) * distance_factor(distance_km)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_steps() {
        assert_eq!(distance_factor(0.0), 1.0);
        assert_eq!(distance_factor(0.05), 1.0);
        // ties take the smaller threshold's factor
        assert_eq!(distance_factor(0.1), 1.0);
        assert_eq!(distance_factor(0.15), 0.8);
        assert_eq!(distance_factor(0.2), 0.8);
        assert_eq!(distance_factor(0.35), 0.5);
        assert_eq!(distance_factor(0.99), 0.2);
        assert_eq!(distance_factor(2.0), 0.1);
        assert_eq!(distance_factor(2.0001), 0.0);
        assert_eq!(distance_factor(50.0), 0.0);
    }

    #[test]
    fn test_thresholds_ascending() {
        for pair in DISTANCE_FACTORS.windows(2) {
            assert!(pair[0].0 < pair[1].0);
            assert!(pair[0].1 > pair[1].1);
        }
    }

    #[test]
    fn test_impact_range() {
        assert_eq!(impact(Severity::High, 0.05), 0.5);
        assert!((impact(Severity::Medium, 0.15) - 0.2).abs() < 1e-12);
        assert!((impact(Severity::Low, 0.3) - 0.05).abs() < 1e-12);
        assert_eq!(impact(Severity::High, 3.0), 0.0);

        for severity in Severity::ALL {
            for d in [0.0, 0.1, 0.3, 0.7, 1.5, 2.5] {
                let i = impact(severity, d);
                assert!((0.0..=0.5).contains(&i), "{severity:?} at {d} km -> {i}");
            }
        }
    }
}
