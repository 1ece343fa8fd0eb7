use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

use crate::base_types::{Meters, Minutes};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// meters per degree of latitude on the local tangent plane
pub const M_PER_DEG_LAT: f64 = 111_320.0;

/// A geographic coordinate in degrees.
#[derive(Display, From, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[display(fmt = "({:.6}, {:.6})", lat, lng)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> Meters {
    haversine_km(a, b) * 1000.0
}

/// A point on the local tangent plane, in meters relative to the workplace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    pub x: Meters,
    pub y: Meters,
}

impl PlanarPoint {
    pub fn distance(&self, other: PlanarPoint) -> Meters {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// distance to the origin of the plane (the workplace)
    pub fn norm(&self) -> Meters {
        self.x.hypot(self.y)
    }
}

/// Equirectangular projection onto a tangent plane anchored at the workplace.
/// Adequate at commute scale; all planar geometry of the stop engine runs on
/// these coordinates.
pub struct Projector {
    origin: GeoPoint,
    cos_lat: f64,
}

impl Projector {
    pub fn new(origin: GeoPoint) -> Projector {
        Projector {
            origin,
            cos_lat: origin.lat.to_radians().cos(),
        }
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub fn project(&self, p: GeoPoint) -> PlanarPoint {
        PlanarPoint {
            x: (p.lng - self.origin.lng) * M_PER_DEG_LAT * self.cos_lat,
            y: (p.lat - self.origin.lat) * M_PER_DEG_LAT,
        }
    }
}

/// Travel-time source for the planning pipeline. Implementations must be
/// `Send + Sync` so the planner can fan phases out across threads.
pub trait TravelTimeAdapter: Send + Sync {
    /// driving time in minutes between two points
    fn drive_minutes(&self, from: GeoPoint, to: GeoPoint) -> Minutes;

    /// walking distance in meters between two points
    fn walk_meters(&self, from: GeoPoint, to: GeoPoint) -> Meters;
}

/// Default adapter: great-circle distance at constant driving speed, straight
/// line walking. No road network involved.
pub struct HaversineAdapter {
    speed_kmh: f64,
}

impl HaversineAdapter {
    pub fn new(speed_kmh: f64) -> HaversineAdapter {
        HaversineAdapter {
            speed_kmh: speed_kmh.max(1.0),
        }
    }
}

impl Default for HaversineAdapter {
    fn default() -> HaversineAdapter {
        HaversineAdapter::new(30.0)
    }
}

impl TravelTimeAdapter for HaversineAdapter {
    fn drive_minutes(&self, from: GeoPoint, to: GeoPoint) -> Minutes {
        haversine_km(from, to) / self.speed_kmh * 60.0
    }

    fn walk_meters(&self, from: GeoPoint, to: GeoPoint) -> Meters {
        haversine_m(from, to)
    }
}
