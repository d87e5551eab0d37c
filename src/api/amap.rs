//! AMap (高德) REST adapter for [`GeoService`].
//!
//! Numeric fields arrive as strings (occasionally as numbers, and empty
//! text fields as `[]`), so decoding is lenient about representation but
//! strict about shape: a missing or non-numeric value is a
//! [`ServiceError::Decode`], not a silent default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, warn};

use super::service::{GeoService, Geocode, Lookup};
use super::throttle::RequestThrottler;
use crate::config::ServiceConfig;
use crate::domain::{Coordinates, RawPoi, TravelMode};
use crate::error::{GeocodeError, ServiceError};

const USER_AGENT: &str = concat!("nearpoi/", env!("CARGO_PKG_VERSION"));

/// Accept a string, a number, or an empty array/null (rendered as "").
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    geocodes: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    location: String,
    #[serde(default, deserialize_with = "lenient_text")]
    city: String,
}

#[derive(Debug, Deserialize)]
struct PlaceAroundResponse {
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    pois: Vec<PoiEntry>,
}

#[derive(Debug, Deserialize)]
struct PoiEntry {
    name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    location: String,
    #[serde(default, deserialize_with = "lenient_text")]
    address: String,
}

#[derive(Debug, Deserialize)]
struct DistanceResponse {
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    results: Vec<DistanceEntry>,
}

#[derive(Debug, Deserialize)]
struct DistanceEntry {
    #[serde(deserialize_with = "lenient_text")]
    distance: String,
}

#[derive(Debug, Deserialize)]
struct PathEntry {
    #[serde(deserialize_with = "lenient_text")]
    duration: String,
}

#[derive(Debug, Deserialize)]
struct DrivingResponse {
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    route: Option<DrivingRoute>,
}

#[derive(Debug, Deserialize)]
struct DrivingRoute {
    #[serde(default)]
    paths: Vec<PathEntry>,
}

#[derive(Debug, Deserialize)]
struct TransitResponse {
    status: String,
    #[serde(default)]
    info: String,
    #[serde(default)]
    route: Option<TransitRoute>,
}

#[derive(Debug, Deserialize)]
struct TransitRoute {
    #[serde(default)]
    transits: Vec<PathEntry>,
}

#[derive(Debug, Deserialize)]
struct BicyclingResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    data: Option<BicyclingData>,
}

#[derive(Debug, Deserialize)]
struct BicyclingData {
    #[serde(default)]
    paths: Vec<PathEntry>,
}

fn check_status(status: &str, info: &str) -> Result<(), ServiceError> {
    if status == "1" {
        Ok(())
    } else {
        Err(ServiceError::Provider {
            code: status.to_string(),
            info: info.to_string(),
        })
    }
}

fn parse_number(field: &str, text: &str) -> Result<f64, ServiceError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| ServiceError::Decode(format!("{} is not a number: '{}'", field, text)))
}

fn first_duration(paths: &[PathEntry]) -> Result<Lookup<u64>, ServiceError> {
    match paths.first() {
        Some(path) => Ok(Lookup::Found(parse_number("duration", &path.duration)?.round() as u64)),
        None => Ok(Lookup::Empty),
    }
}

/// Log a failed call and turn it into an unavailable value.
fn settle<T>(call: &'static str, outcome: Result<Lookup<T>, ServiceError>) -> Lookup<T> {
    match outcome {
        Ok(lookup) => lookup,
        Err(err) => {
            warn!(call, error = %err, "geo service call failed");
            Lookup::Unavailable(err)
        }
    }
}

/// Throttled AMap web-service client
#[derive(Clone)]
pub struct AmapClient {
    http: reqwest::Client,
    base_url: String,
    key: String,
    throttler: RequestThrottler,
}

impl AmapClient {
    /// Build a client. All requests share `throttler`.
    ///
    /// # Errors
    /// Returns [`ServiceError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        config: &ServiceConfig,
        key: impl Into<String>,
        throttler: RequestThrottler,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key: key.into(),
            throttler,
        })
    }

    pub fn throttler(&self) -> &RequestThrottler {
        &self.throttler
    }

    /// GET `path` through the throttler and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let mut query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        query.push(("key", self.key.as_str()));

        let body = self
            .throttler
            .submit(async {
                // without_url keeps the key out of error messages
                let response = self
                    .http
                    .get(&url)
                    .query(&query)
                    .send()
                    .await
                    .map_err(|e| ServiceError::Transport(e.without_url().to_string()))?;

                let status = response.status();
                if !status.is_success() {
                    return Err(ServiceError::Transport(format!("HTTP status {}", status)));
                }

                response
                    .text()
                    .await
                    .map_err(|e| ServiceError::Transport(e.without_url().to_string()))
            })
            .await?;

        debug!(path, bytes = body.len(), "geo service responded");
        serde_json::from_str(&body).map_err(|e| ServiceError::Decode(format!("{}: {}", path, e)))
    }

    async fn fetch_geocode(&self, address: &str) -> Result<Geocode, GeocodeError> {
        let response: GeocodeResponse = self
            .get_json(
                "/v3/geocode/geo",
                &[("address", address.to_string()), ("output", "JSON".to_string())],
            )
            .await?;
        check_status(&response.status, &response.info)?;

        let entry = response
            .geocodes
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NotFound(address.to_string()))?;

        let location = Coordinates::from_lng_lat(&entry.location).ok_or_else(|| {
            ServiceError::Decode(format!("bad geocode location '{}'", entry.location))
        })?;

        if entry.city.trim().is_empty() {
            return Err(GeocodeError::CityUnknown(address.to_string()));
        }

        Ok(Geocode {
            location,
            city: entry.city,
        })
    }

    async fn fetch_nearby(
        &self,
        origin: Coordinates,
        category_code: &str,
        radius_m: u32,
        max_results: u32,
    ) -> Result<Lookup<Vec<RawPoi>>, ServiceError> {
        let response: PlaceAroundResponse = self
            .get_json(
                "/v3/place/around",
                &[
                    ("location", origin.to_string()),
                    ("types", category_code.to_string()),
                    ("radius", radius_m.to_string()),
                    ("offset", max_results.to_string()),
                    ("citylimit", "true".to_string()),
                    ("output", "JSON".to_string()),
                    ("extensions", "all".to_string()),
                    ("sortby", "distance".to_string()),
                    ("children", "1".to_string()),
                ],
            )
            .await?;
        check_status(&response.status, &response.info)?;

        if response.pois.is_empty() {
            return Ok(Lookup::Empty);
        }

        let pois = response
            .pois
            .into_iter()
            .map(|poi| RawPoi {
                coordinates: Coordinates::from_lng_lat(&poi.location),
                name: poi.name,
                address: poi.address,
            })
            .collect();
        Ok(Lookup::Found(pois))
    }

    async fn fetch_distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Lookup<f64>, ServiceError> {
        let response: DistanceResponse = self
            .get_json(
                "/v3/distance",
                &[
                    ("origins", origin.to_string()),
                    ("destination", destination.to_string()),
                    ("type", "0".to_string()),
                ],
            )
            .await?;
        check_status(&response.status, &response.info)?;

        match response.results.first() {
            Some(entry) => Ok(Lookup::Found(parse_number("distance", &entry.distance)?)),
            None => Ok(Lookup::Empty),
        }
    }

    async fn fetch_duration(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: TravelMode,
        city: &str,
    ) -> Result<Lookup<u64>, ServiceError> {
        let mut params = vec![
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
        ];

        match mode {
            TravelMode::Driving => {
                params.push(("extensions", "base".to_string()));
                let response: DrivingResponse =
                    self.get_json("/v3/direction/driving", &params).await?;
                check_status(&response.status, &response.info)?;
                first_duration(&response.route.map(|r| r.paths).unwrap_or_default())
            }
            TravelMode::Transit => {
                params.push(("city", city.to_string()));
                params.push(("extensions", "base".to_string()));
                let response: TransitResponse = self
                    .get_json("/v3/direction/transit/integrated", &params)
                    .await?;
                check_status(&response.status, &response.info)?;
                first_duration(&response.route.map(|r| r.transits).unwrap_or_default())
            }
            TravelMode::Cycling => {
                let response: BicyclingResponse =
                    self.get_json("/v4/direction/bicycling", &params).await?;
                if response.errcode != 0 {
                    return Err(ServiceError::Provider {
                        code: response.errcode.to_string(),
                        info: response.errmsg,
                    });
                }
                first_duration(&response.data.map(|d| d.paths).unwrap_or_default())
            }
        }
    }
}

impl GeoService for AmapClient {
    async fn geocode(&self, address: &str) -> Result<Geocode, GeocodeError> {
        self.fetch_geocode(address).await
    }

    async fn search_nearby(
        &self,
        origin: Coordinates,
        category_code: &str,
        radius_m: u32,
        max_results: u32,
    ) -> Lookup<Vec<RawPoi>> {
        settle(
            "place/around",
            self.fetch_nearby(origin, category_code, radius_m, max_results)
                .await,
        )
    }

    async fn straight_line_distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Lookup<f64> {
        settle("distance", self.fetch_distance(origin, destination).await)
    }

    async fn route_duration(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: TravelMode,
        city: &str,
    ) -> Lookup<u64> {
        let call = match mode {
            TravelMode::Driving => "direction/driving",
            TravelMode::Transit => "direction/transit",
            TravelMode::Cycling => "direction/bicycling",
        };
        settle(call, self.fetch_duration(origin, destination, mode, city).await)
    }
}
