//! Capability interface to the external geo service.
//!
//! The search pipeline only talks to a [`GeoService`]; the concrete
//! provider adapter lives in [`crate::api::amap`].

use std::future::Future;

use crate::domain::{Coordinates, RawPoi, TravelMode};
use crate::error::{GeocodeError, ServiceError};

/// Outcome of a lookup that can legitimately come back empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    /// The call succeeded but there was nothing to return.
    Empty,
    /// The call failed; the caller carries on without this value.
    Unavailable(ServiceError),
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Empty | Lookup::Unavailable(_) => None,
        }
    }
}

/// A geocoded address
#[derive(Debug, Clone, PartialEq)]
pub struct Geocode {
    pub location: Coordinates,
    pub city: String,
}

/// The four operations the search pipeline needs from a geo service.
///
/// Implementations route every call through a
/// [`RequestThrottler`](crate::api::RequestThrottler) and never panic or
/// bubble transport failures out of the per-POI lookups; those become
/// [`Lookup::Unavailable`].
pub trait GeoService: Send + Sync {
    /// Resolve an address to coordinates and a city.
    ///
    /// # Errors
    ///
    /// [`GeocodeError::NotFound`] when the service has no match,
    /// [`GeocodeError::CityUnknown`] when the match has no city, and
    /// [`GeocodeError::Service`] when the call itself failed.
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Geocode, GeocodeError>> + Send;

    /// Places of one category around `origin`, nearest first.
    fn search_nearby(
        &self,
        origin: Coordinates,
        category_code: &str,
        radius_m: u32,
        max_results: u32,
    ) -> impl Future<Output = Lookup<Vec<RawPoi>>> + Send;

    /// Straight-line distance in meters.
    fn straight_line_distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> impl Future<Output = Lookup<f64>> + Send;

    /// Travel duration in seconds. `city` is needed for transit routing.
    fn route_duration(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: TravelMode,
        city: &str,
    ) -> impl Future<Output = Lookup<u64>> + Send;
}
