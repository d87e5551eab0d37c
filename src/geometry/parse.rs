//! Parsers for the formatted distance and coordinate text that travels
//! alongside POI records.
//!
//! Both return `None` when nothing usable is found; callers decide what an
//! unparseable value means.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::Coordinates;

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid regex"));

static LNG_LAT_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(-?\d+\.\d+)\s*,\s*(-?\d+\.\d+)").expect("valid regex"));

static LABELLED_LNG_LAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"经度[：:]\s*(-?\d+\.\d+).*纬度[：:]\s*(-?\d+\.\d+)").expect("valid regex")
});

/// Extract a distance in meters from text such as `"500米"`, `"1.2公里"`,
/// `"850 m"` or `"3km"`.
///
/// The first number in the text is used. Kilometer units (`公里`, `km`)
/// scale by 1000; anything else, including no unit at all, is meters.
pub fn parse_distance_meters(text: &str) -> Option<f64> {
    let captures = NUMBER.captures(text)?;
    let value: f64 = captures[1].parse().ok()?;

    let lower = text.to_lowercase();
    if text.contains("公里") || lower.contains("km") {
        Some(value * 1000.0)
    } else {
        Some(value)
    }
}

/// Extract coordinates embedded in free text.
///
/// Recognises a bare `"lng,lat"` decimal pair, or the labelled form
/// `"经度: <lng> ... 纬度: <lat>"`.
pub fn parse_coordinates(text: &str) -> Option<Coordinates> {
    let captures = LNG_LAT_PAIR
        .captures(text)
        .or_else(|| LABELLED_LNG_LAT.captures(text))?;

    let lng: f64 = captures[1].parse().ok()?;
    let lat: f64 = captures[2].parse().ok()?;
    Some(Coordinates::new(lng, lat))
}
