use crate::domain::Coordinates;

/// Earth radius used for all great-circle distances, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two WGS84 points (Haversine formula)
///
/// Accurate to well under a meter at the sub-kilometer ranges the dedup
/// checks operate on. Symmetric, and exactly 0.0 for identical inputs.
///
/// # Returns
/// * Distance in meters
pub fn geo_distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    // Clamp guards against h drifting just above 1.0 for antipodal points
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_M * c
}
