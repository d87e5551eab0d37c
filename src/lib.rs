//! nearpoi - Find points of interest near an address, with travel times and
//! fuzzy de-duplication of near-identical results

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod matching;
pub mod search;

pub use api::{AmapClient, GeoService, RequestThrottler, ThrottleConfig};
pub use config::FileConfig;
pub use domain::{Category, Coordinates, PoiCandidate, Reading};
pub use error::{ConfigError, GeocodeError, SearchError, ServiceError};
pub use matching::{MatchConfig, merge_all_categories};
pub use search::{CategoryOutcome, CategoryResult, NearbySearch, SearchOptions, SearchReport};
