use serde::{Deserialize, Serialize};

use crate::types::Coordinate;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rough kilometers per degree used for bounding-box queries.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Haversine great-circle distance in kilometers.
///
/// Results are undefined for coordinates outside the valid lat/lng ranges.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Axis-aligned lat/lng box, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Square box of half-width `radius_km` around `center`.
    pub fn around(center: Coordinate, radius_km: f64) -> Self {
        let radius_deg = radius_km / KM_PER_DEGREE;
        Self {
            south: center.lat - radius_deg,
            north: center.lat + radius_deg,
            west: center.lng - radius_deg,
            east: center.lng + radius_deg,
        }
    }

    /// Smallest box holding every point, grown by `buffer_km` on each side.
    /// `None` for an empty iterator.
    pub fn enclosing<I>(points: I, buffer_km: f64) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let buffer_deg = buffer_km / KM_PER_DEGREE;
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bbox = Self {
            south: first.lat,
            north: first.lat,
            west: first.lng,
            east: first.lng,
        };
        for p in points {
            bbox.south = bbox.south.min(p.lat);
            bbox.north = bbox.north.max(p.lat);
            bbox.west = bbox.west.min(p.lng);
            bbox.east = bbox.east.max(p.lng);
        }
        bbox.south -= buffer_deg;
        bbox.north += buffer_deg;
        bbox.west -= buffer_deg;
        bbox.east += buffer_deg;
        Some(bbox)
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        c.lat >= self.south && c.lat <= self.north && c.lng >= self.west && c.lng <= self.east
    }
}
