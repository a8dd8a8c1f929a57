use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use hazard_engine::{now_ms, BoundingBox, Coordinate, Hazard, HazardLookup};
use parking_lot::RwLock;

use crate::types::{HazardQuery, HazardUpdate, NewHazard};

const MS_PER_HOUR: i64 = 3_600_000;

/// Shared in-memory hazard table keyed by id.
#[derive(Clone, Default)]
pub struct HazardStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    hazards: BTreeMap<u64, Hazard>,
    last_id: u64,
}

impl HazardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().hazards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Next id that `create` would hand out.
    pub fn next_id(&self) -> u64 {
        self.inner.read().last_id + 1
    }

    pub fn create(&self, new: NewHazard) -> Hazard {
        let mut inner = self.inner.write();
        inner.last_id += 1;
        let hazard = Hazard {
            id: inner.last_id,
            latitude: new.latitude,
            longitude: new.longitude,
            hazard_type: new.hazard_type,
            severity_level: new.severity_level,
            detection_timestamp: new.detection_timestamp.unwrap_or_else(now_ms),
            confidence_score: new.confidence_score,
            image_path: new.image_path,
            speed_limit: new.speed_limit,
            recommended_speed: new.recommended_speed,
            verified: new.verified,
            road_name: new.road_name,
            area: new.area,
            weather_condition: new.weather_condition,
        };
        inner.hazards.insert(hazard.id, hazard.clone());
        hazard
    }

    /// Bulk insert keeping the given ids.
    pub fn extend(&self, hazards: Vec<Hazard>) {
        let mut inner = self.inner.write();
        for hazard in hazards {
            inner.last_id = inner.last_id.max(hazard.id);
            inner.hazards.insert(hazard.id, hazard);
        }
    }

    pub fn get(&self, id: u64) -> Option<Hazard> {
        self.inner.read().hazards.get(&id).cloned()
    }

    pub fn update(&self, id: u64, update: HazardUpdate) -> Option<Hazard> {
        let mut inner = self.inner.write();
        let hazard = inner.hazards.get_mut(&id)?;
        if let Some(verified) = update.verified {
            hazard.verified = verified;
        }
        if let Some(severity) = update.severity_level {
            hazard.severity_level = severity;
        }
        if let Some(speed) = update.recommended_speed {
            hazard.recommended_speed = speed;
        }
        if let Some(weather) = update.weather_condition {
            hazard.weather_condition = Some(weather);
        }
        Some(hazard.clone())
    }

    pub fn remove(&self, id: u64) -> Option<Hazard> {
        self.inner.write().hazards.remove(&id)
    }

    pub fn within(&self, bbox: &BoundingBox) -> Vec<Hazard> {
        self.inner
            .read()
            .hazards
            .values()
            .filter(|h| bbox.contains(h.coordinate()))
            .cloned()
            .collect()
    }

    /// Filtered listing; the box applies only when all four edges are given.
    pub fn query(&self, q: &HazardQuery, now_ms: i64) -> Vec<Hazard> {
        let bbox = match (q.south, q.north, q.west, q.east) {
            (Some(south), Some(north), Some(west), Some(east)) => Some(BoundingBox {
                south,
                north,
                west,
                east,
            }),
            _ => None,
        };
        let cutoff = (q.hours_back > 0).then(|| now_ms - q.hours_back * MS_PER_HOUR);

        self.inner
            .read()
            .hazards
            .values()
            .filter(|h| bbox.map_or(true, |b| b.contains(h.coordinate())))
            .filter(|h| q.hazard_type.map_or(true, |t| h.hazard_type == t))
            .filter(|h| q.severity_level.map_or(true, |s| h.severity_level == s))
            .filter(|h| !q.verified_only || h.verified)
            .filter(|h| cutoff.map_or(true, |c| h.detection_timestamp >= c))
            .cloned()
            .collect()
    }
}

impl HazardLookup for HazardStore {
    type Error = Infallible;

    fn hazards_near(&self, center: Coordinate, radius_km: f64) -> Result<Vec<Hazard>, Infallible> {
        Ok(self.within(&BoundingBox::around(center, radius_km)))
    }
}
