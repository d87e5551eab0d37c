//! Address-to-nearby-places pipeline.
//!
//! Geocode once, then search every category concurrently. Each place found
//! is enriched with a straight-line distance and three travel durations,
//! after which near-duplicates within a category are merged.

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::api::{GeoService, Geocode, Lookup};
use crate::config::FileConfig;
use crate::domain::{Category, Coordinates, PoiCandidate, RawPoi, Reading, TravelMode};
use crate::error::SearchError;
use crate::matching::{MatchConfig, merge_similar_pois};

/// What to search for and how to post-process it
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub categories: Vec<Category>,
    pub radius_m: u32,
    pub max_results: u32,
    pub matching: MatchConfig,
    /// Merge near-duplicates within each category
    pub merge: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&FileConfig::default())
    }
}

impl SearchOptions {
    pub fn from_config(config: &FileConfig) -> Self {
        Self {
            categories: config.categories.clone(),
            radius_m: config.search.radius_m,
            max_results: config.search.max_results,
            matching: config.matching,
            merge: true,
        }
    }
}

/// Result of one category search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryOutcome {
    /// Places found, possibly none.
    Pois(Vec<PoiCandidate>),
    /// The nearby search itself failed.
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResult {
    pub label: String,
    #[serde(flatten)]
    pub outcome: CategoryOutcome,
}

impl CategoryResult {
    pub fn pois(&self) -> &[PoiCandidate] {
        match &self.outcome {
            CategoryOutcome::Pois(pois) => pois,
            CategoryOutcome::Unavailable(_) => &[],
        }
    }
}

/// Everything found around one address, categories in configured order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub address: String,
    pub origin: Coordinates,
    pub city: String,
    pub categories: Vec<CategoryResult>,
}

impl SearchReport {
    /// Category label to places. Unavailable categories map to an empty list.
    pub fn to_map(&self) -> BTreeMap<String, Vec<PoiCandidate>> {
        self.categories
            .iter()
            .map(|c| (c.label.clone(), c.pois().to_vec()))
            .collect()
    }

    pub fn total_pois(&self) -> usize {
        self.categories.iter().map(|c| c.pois().len()).sum()
    }
}

pub struct NearbySearch<S> {
    service: S,
    options: SearchOptions,
}

impl<S: GeoService> NearbySearch<S> {
    pub fn new(service: S, options: SearchOptions) -> Self {
        Self { service, options }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Find places of every configured category around `address`.
    ///
    /// # Errors
    /// Fails only when the address is blank or cannot be geocoded. Failed
    /// category searches and enrichment calls are reported in the result.
    pub async fn search(&self, address: &str) -> Result<SearchReport, SearchError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(SearchError::EmptyAddress);
        }

        let origin = self.service.geocode(address).await?;
        info!(address, origin = %origin.location, city = %origin.city, "geocoded address");

        let categories = join_all(
            self.options
                .categories
                .iter()
                .map(|category| self.search_category(category, &origin)),
        )
        .await;

        let report = SearchReport {
            address: address.to_string(),
            origin: origin.location,
            city: origin.city,
            categories,
        };
        info!(
            categories = report.categories.len(),
            pois = report.total_pois(),
            "search complete"
        );
        Ok(report)
    }

    async fn search_category(&self, category: &Category, origin: &Geocode) -> CategoryResult {
        let lookup = self
            .service
            .search_nearby(
                origin.location,
                &category.code,
                self.options.radius_m,
                self.options.max_results,
            )
            .await;

        let outcome = match lookup {
            Lookup::Unavailable(err) => {
                warn!(category = %category.label, error = %err, "category search unavailable");
                CategoryOutcome::Unavailable(err.to_string())
            }
            Lookup::Empty => {
                debug!(category = %category.label, "no places found");
                CategoryOutcome::Pois(Vec::new())
            }
            Lookup::Found(raw) => {
                let mut pois = Vec::with_capacity(raw.len());
                for place in raw {
                    pois.push(self.enrich(&category.label, place, origin).await);
                }

                let found = pois.len();
                if self.options.merge {
                    pois = merge_similar_pois(pois, &self.options.matching);
                }
                info!(category = %category.label, found, kept = pois.len(), "category searched");
                CategoryOutcome::Pois(pois)
            }
        };

        CategoryResult {
            label: category.label.clone(),
            outcome,
        }
    }

    /// Fill in distance and travel times.
    ///
    /// A place without a location stays unenriched.
    async fn enrich(&self, label: &str, place: RawPoi, origin: &Geocode) -> PoiCandidate {
        let mut poi = PoiCandidate::new(label, place);
        let Some(destination) = poi.location() else {
            debug!(category = label, name = %poi.name, "place has no location");
            return poi;
        };

        let from = origin.location;
        let city = origin.city.as_str();
        let (distance, durations) = tokio::join!(
            self.service.straight_line_distance(from, destination),
            join_all(
                TravelMode::ALL
                    .map(|mode| self.service.route_duration(from, destination, mode, city)),
            ),
        );

        poi.distance = distance.found().map(Reading::meters).unwrap_or_default();
        for (mode, duration) in TravelMode::ALL.into_iter().zip(durations) {
            let reading = duration.found().map(Reading::minutes).unwrap_or_default();
            poi.set_travel_time(mode, reading);
        }
        poi
    }
}
