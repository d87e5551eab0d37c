use serde::{Deserialize, Serialize};
use std::fmt;

use super::Coordinates;
use crate::geometry::{parse_coordinates, parse_distance_meters};

/// Travel modes the route service can estimate durations for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Transit,
    Cycling,
}

impl TravelMode {
    pub const ALL: [TravelMode; 3] = [
        TravelMode::Driving,
        TravelMode::Transit,
        TravelMode::Cycling,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Transit => "transit",
            TravelMode::Cycling => "cycling",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An enrichment value: either formatted text with its unit, or unavailable.
///
/// Serialises as the formatted string, or `null` when unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Available(String),
    #[default]
    Unavailable,
}

impl Reading {
    /// Straight-line distance in the provider's display form, e.g. `"500米"`.
    pub fn meters(meters: f64) -> Self {
        Reading::Available(format!("{:.0}米", meters))
    }

    /// Travel duration rounded to whole minutes, e.g. `"12分钟"`.
    pub fn minutes(seconds: u64) -> Self {
        let minutes = (seconds as f64 / 60.0).round() as u64;
        Reading::Available(format!("{}分钟", minutes))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Available(_))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reading::Available(text) => Some(text),
            Reading::Unavailable => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Available(text) => f.write_str(text),
            Reading::Unavailable => f.write_str("N/A"),
        }
    }
}

/// A place as returned by a nearby search, before route enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct RawPoi {
    pub name: String,
    pub address: String,
    pub coordinates: Option<Coordinates>,
}

/// One enriched place for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiCandidate {
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub distance: Reading,
    #[serde(default)]
    pub driving: Reading,
    #[serde(default)]
    pub transit: Reading,
    #[serde(default)]
    pub cycling: Reading,
}

impl PoiCandidate {
    /// A candidate with every enrichment field unavailable.
    pub fn new(category: impl Into<String>, raw: RawPoi) -> Self {
        Self {
            category: category.into(),
            name: raw.name,
            address: raw.address,
            coordinates: raw.coordinates,
            distance: Reading::Unavailable,
            driving: Reading::Unavailable,
            transit: Reading::Unavailable,
            cycling: Reading::Unavailable,
        }
    }

    pub fn set_travel_time(&mut self, mode: TravelMode, reading: Reading) {
        match mode {
            TravelMode::Driving => self.driving = reading,
            TravelMode::Transit => self.transit = reading,
            TravelMode::Cycling => self.cycling = reading,
        }
    }

    /// Reported distance from the search origin, if it parses.
    pub fn distance_meters(&self) -> Option<f64> {
        self.distance.as_text().and_then(parse_distance_meters)
    }

    /// Explicit coordinates, falling back to coordinates embedded in the address text.
    pub fn location(&self) -> Option<Coordinates> {
        self.coordinates.or_else(|| parse_coordinates(&self.address))
    }
}
