//! Error types for nearpoi.
//!
//! Only [`SearchError`] ever aborts a search. Per-call [`ServiceError`]s are
//! recovered at the client boundary and show up as unavailable values.

use std::path::PathBuf;

/// Failure of a single call to the geo service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    /// Network failure or non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered but reported a failure status.
    #[error("service returned status {code}: {info}")]
    Provider { code: String, info: String },

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Why an address could not be turned into a search origin.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeocodeError {
    #[error("address not found: {0}")]
    NotFound(String),

    /// Transit routing needs the city, so a geocode without one is unusable.
    #[error("could not determine the city for address: {0}")]
    CityUnknown(String),

    #[error("geocoding failed: {0}")]
    Service(#[from] ServiceError),
}

/// Fatal search failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error("no address given")]
    EmptyAddress,

    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

/// Problems loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
