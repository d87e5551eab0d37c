//! End-to-end search against an in-memory geo service that shares a real
//! throttler, on tokio's paused clock.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nearpoi::api::{GeoService, Geocode, Lookup, RequestThrottler, ThrottleConfig};
use nearpoi::domain::{Category, Coordinates, RawPoi, TravelMode};
use nearpoi::error::{GeocodeError, ServiceError};
use nearpoi::geometry::geo_distance_meters;
use nearpoi::search::{CategoryOutcome, NearbySearch, SearchOptions};
use tokio::time::Instant;

const ORIGIN: Coordinates = Coordinates {
    lng: 116.4551,
    lat: 39.9375,
};

struct CityService {
    throttler: RequestThrottler,
    places: HashMap<&'static str, Lookup<Vec<RawPoi>>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    starts: Mutex<Vec<Instant>>,
}

impl CityService {
    fn new(throttler: RequestThrottler) -> Self {
        let mut places = HashMap::new();
        places.insert(
            "150500",
            Lookup::Found(vec![
                place("Sanlitun Station", 116.4612, 39.9402),
                place("Tuanjiehu Station", 116.4618, 39.9338),
                place("Line 10 Sanlitun Station", 116.4610, 39.9401),
            ]),
        );
        places.insert(
            "110101",
            Lookup::Found(vec![place("Chaoyang Park", 116.4787, 39.9441)]),
        );
        places.insert(
            "140300",
            Lookup::Unavailable(ServiceError::Provider {
                code: "0".into(),
                info: "DAILY_QUERY_OVER_LIMIT".into(),
            }),
        );

        Self {
            throttler,
            places,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            starts: Mutex::new(Vec::new()),
        }
    }

    /// Run `value` as a 50 ms request through the shared throttler.
    async fn call<T>(&self, value: T) -> T {
        self.throttler
            .submit(async {
                self.starts.lock().unwrap().push(Instant::now());
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                value
            })
            .await
    }
}

fn place(name: &str, lng: f64, lat: f64) -> RawPoi {
    RawPoi {
        name: name.to_string(),
        address: String::new(),
        coordinates: Some(Coordinates::new(lng, lat)),
    }
}

impl GeoService for CityService {
    async fn geocode(&self, address: &str) -> Result<Geocode, GeocodeError> {
        let geocode = Geocode {
            location: ORIGIN,
            city: "北京市".to_string(),
        };
        if address.contains("三里屯") {
            self.call(Ok(geocode)).await
        } else {
            self.call(Err(GeocodeError::NotFound(address.to_string()))).await
        }
    }

    async fn search_nearby(
        &self,
        _origin: Coordinates,
        category_code: &str,
        _radius_m: u32,
        _max_results: u32,
    ) -> Lookup<Vec<RawPoi>> {
        let answer = self
            .places
            .get(category_code)
            .cloned()
            .unwrap_or(Lookup::Empty);
        self.call(answer).await
    }

    async fn straight_line_distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Lookup<f64> {
        self.call(Lookup::Found(geo_distance_meters(origin, destination)))
            .await
    }

    async fn route_duration(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: TravelMode,
        city: &str,
    ) -> Lookup<u64> {
        assert_eq!(city, "北京市");
        let meters = geo_distance_meters(origin, destination);
        let answer = match mode {
            TravelMode::Driving => Lookup::Found((meters / 8.0) as u64),
            TravelMode::Transit => Lookup::Found((meters / 5.0) as u64 + 300),
            TravelMode::Cycling => Lookup::Unavailable(ServiceError::Transport("timed out".into())),
        };
        self.call(answer).await
    }
}

fn categories() -> Vec<Category> {
    vec![
        Category::new("地铁站", "150500"),
        Category::new("公园", "110101"),
        Category::new("美术馆", "140300"),
        Category::new("图书馆", "140500"),
    ]
}

fn search_with(config: ThrottleConfig) -> NearbySearch<CityService> {
    let service = CityService::new(RequestThrottler::new(config));
    NearbySearch::new(
        service,
        SearchOptions {
            categories: categories(),
            ..SearchOptions::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_full_search_is_throttled_and_merged() {
    let search = search_with(ThrottleConfig::default());
    let start = Instant::now();

    let report = search.search("北京市朝阳区三里屯").await.unwrap();

    // 1 geocode + 4 nearby searches + 4 places x 4 enrichment calls
    let service = search.service();
    assert_eq!(service.throttler.stats().dispatched, 21);
    assert!(service.peak.load(Ordering::SeqCst) <= 3);
    assert!(start.elapsed() >= Duration::from_millis(20 * 200));

    let mut starts = service.starts.lock().unwrap().clone();
    starts.sort();
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(200));
    }

    let labels: Vec<_> = report.categories.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["地铁站", "公园", "美术馆", "图书馆"]);

    let stations = report.categories[0].pois();
    let names: Vec<_> = stations.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Line 10 Sanlitun Station", "Tuanjiehu Station"]);
    assert!(stations[0].distance.as_text().unwrap().ends_with('米'));
    assert!(stations[0].driving.as_text().unwrap().ends_with("分钟"));
    assert!(stations[0].transit.is_available());
    assert_eq!(stations[0].cycling.to_string(), "N/A");

    assert_eq!(report.categories[1].pois().len(), 1);
    assert!(matches!(
        &report.categories[2].outcome,
        CategoryOutcome::Unavailable(reason) if reason.contains("DAILY_QUERY_OVER_LIMIT")
    ));
    assert_eq!(report.categories[3].outcome, CategoryOutcome::Pois(Vec::new()));

    let map = report.to_map();
    assert_eq!(map.len(), 4);
    assert!(map["美术馆"].is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_address_stops_after_geocode() {
    let search = search_with(ThrottleConfig::default());

    let err = search.search("somewhere else").await.unwrap_err();
    assert_eq!(err.to_string(), "address not found: somewhere else");
    assert_eq!(search.service().throttler.stats().dispatched, 1);
}

#[tokio::test(start_paused = true)]
async fn test_wider_throttle_finishes_sooner() {
    let narrow = search_with(ThrottleConfig::new(1, 200));
    let start = Instant::now();
    narrow.search("北京市朝阳区三里屯").await.unwrap();
    let narrow_elapsed = start.elapsed();
    assert_eq!(narrow.service().peak.load(Ordering::SeqCst), 1);

    let wide = search_with(ThrottleConfig::new(3, 0));
    let start = Instant::now();
    wide.search("北京市朝阳区三里屯").await.unwrap();
    assert!(start.elapsed() < narrow_elapsed);
    assert!(wide.service().peak.load(Ordering::SeqCst) > 1);
}
