use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 position. Field order follows the provider's "lng,lat" convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinates {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Parse the provider's `"lng,lat"` form.
    pub fn from_lng_lat(text: &str) -> Option<Self> {
        let (lng, lat) = text.trim().split_once(',')?;
        let lng: f64 = lng.trim().parse().ok()?;
        let lat: f64 = lat.trim().parse().ok()?;
        if !lng.is_finite() || !lat.is_finite() {
            return None;
        }
        Some(Self { lng, lat })
    }
}

impl fmt::Display for Coordinates {
    /// Formats as `"lng,lat"`, the shape the provider expects in query strings.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lng, self.lat)
    }
}
