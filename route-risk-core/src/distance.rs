use crate::model::Place;

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Flat average road speed assumed for duration estimates.
pub const AVERAGE_SPEED_MPH: f64 = 50.0;

/// Distance and naive travel time between two places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEstimate {
    pub distance_miles: f64,
    pub duration_min: f64,
}

impl RouteEstimate {
    pub fn between(from: &Place, to: &Place) -> Self {
        let distance_miles = distance_miles(from.lat, from.lon, to.lat, to.lon);
        Self { distance_miles, duration_min: estimate_duration_minutes(distance_miles) }
    }
}

/// Great-circle distance between two coordinates (degrees) using the haversine formula.
pub fn distance_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_MILES * c
}

/// Naive driving time in minutes; no road network or traffic.
pub fn estimate_duration_minutes(distance_miles: f64) -> f64 {
    (distance_miles / AVERAGE_SPEED_MPH) * 60.0
}
