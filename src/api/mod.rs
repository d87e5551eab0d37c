pub mod amap;
pub mod service;
pub mod throttle;

pub use amap::AmapClient;
pub use service::{GeoService, Geocode, Lookup};
pub use throttle::{RequestThrottler, ThrottleConfig, ThrottleStats};
