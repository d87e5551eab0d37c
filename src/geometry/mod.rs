pub mod haversine;
pub mod parse;

pub use haversine::{EARTH_RADIUS_M, geo_distance_meters};
pub use parse::{parse_coordinates, parse_distance_meters};
