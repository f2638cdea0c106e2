//! Great-circle geometry helpers shared by the run session, GPS filter and
//! best-effort extraction.

use crate::models::GpsPoint;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two lat/lng pairs given in degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Distance in meters between two fixes
pub fn point_distance(a: &GpsPoint, b: &GpsPoint) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Cumulative distance along a track, one entry per point (first is 0)
pub fn cumulative_distances(track: &[GpsPoint]) -> Vec<f64> {
    let mut total = 0.0;
    let mut out = Vec::with_capacity(track.len());
    for (i, point) in track.iter().enumerate() {
        if i > 0 {
            total += point_distance(&track[i - 1], point);
        }
        out.push(total);
    }
    out
}

/// Latitude offset in degrees that moves a point `meters` due north
pub fn meters_to_latitude_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_M).to_degrees()
}
