use serde::{Deserialize, Serialize};

use crate::models::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const ARRIVAL_THRESHOLD_METERS: f64 = 50.0;

/// Great-circle distance between two points.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lng = (to.longitude - from.longitude).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    pub fn from_path(path: &[Coordinate]) -> Option<Self> {
        let first = path.first()?;
        let mut bounds = Self {
            south_west: *first,
            north_east: *first,
        };
        for point in &path[1..] {
            bounds.south_west.latitude = bounds.south_west.latitude.min(point.latitude);
            bounds.south_west.longitude = bounds.south_west.longitude.min(point.longitude);
            bounds.north_east.latitude = bounds.north_east.latitude.max(point.latitude);
            bounds.north_east.longitude = bounds.north_east.longitude.max(point.longitude);
        }
        Some(bounds)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.south_west.latitude + self.north_east.latitude) / 2.0,
            longitude: (self.south_west.longitude + self.north_east.longitude) / 2.0,
        }
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        (self.south_west.latitude..=self.north_east.latitude).contains(&point.latitude)
            && (self.south_west.longitude..=self.north_east.longitude).contains(&point.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationProgress {
    pub remaining_meters: f64,
    pub instruction: String,
    pub arrived: bool,
}

impl NavigationProgress {
    pub fn between(current: Coordinate, destination: Coordinate) -> Self {
        let remaining_meters = haversine_km(current, destination) * 1000.0;
        let arrived = remaining_meters < ARRIVAL_THRESHOLD_METERS;
        let instruction = if arrived {
            "You have arrived!".to_string()
        } else {
            format!("Continue for {:.1} km", remaining_meters / 1000.0)
        };

        Self {
            remaining_meters,
            instruction,
            arrived,
        }
    }
}
