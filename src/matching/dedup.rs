use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::similarity::name_similarity;
use crate::domain::PoiCandidate;
use crate::geometry::geo_distance_meters;

fn default_name_threshold() -> f64 {
    0.7
}
fn default_fallback_name_threshold() -> f64 {
    0.5
}
fn default_max_origin_distance_delta_m() -> f64 {
    100.0
}
fn default_max_geo_distance_m() -> f64 {
    100.0
}

/// Thresholds for deciding that two candidates are the same place
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Name similarity at or above which two candidates match outright
    #[serde(default = "default_name_threshold")]
    pub name_threshold: f64,
    /// Lower name similarity accepted when the coordinates are close
    #[serde(default = "default_fallback_name_threshold")]
    pub fallback_name_threshold: f64,
    /// Candidates whose reported distances from the origin differ by more
    /// than this never match
    #[serde(default = "default_max_origin_distance_delta_m")]
    pub max_origin_distance_delta_m: f64,
    /// Coordinate proximity for the fallback rule
    #[serde(default = "default_max_geo_distance_m")]
    pub max_geo_distance_m: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            name_threshold: default_name_threshold(),
            fallback_name_threshold: default_fallback_name_threshold(),
            max_origin_distance_delta_m: default_max_origin_distance_delta_m(),
            max_geo_distance_m: default_max_geo_distance_m(),
        }
    }
}

/// Reported origin distance used for matching and representative selection.
///
/// Unparseable or unavailable distances count as 0 m. This can let unrelated
/// candidates pass the origin-distance window; it is kept as-is rather than
/// guessing a better default.
fn origin_distance(poi: &PoiCandidate) -> f64 {
    poi.distance_meters().unwrap_or(0.0)
}

/// Decide whether two candidates denote the same physical place
///
/// # Rules (first decisive rule wins)
/// 1. Reported origin distances differ by more than the window → different
/// 2. Names similar enough → same
/// 3. Both have coordinates, they are within the geo window, and the names
///    are at least loosely similar → same
/// 4. Otherwise different
pub fn is_same_location(a: &PoiCandidate, b: &PoiCandidate, config: &MatchConfig) -> bool {
    let delta = (origin_distance(a) - origin_distance(b)).abs();
    if delta > config.max_origin_distance_delta_m {
        return false;
    }

    let similarity = name_similarity(&a.name, &b.name);
    if similarity >= config.name_threshold {
        return true;
    }

    if let (Some(pa), Some(pb)) = (a.location(), b.location()) {
        let apart = geo_distance_meters(pa, pb);
        if apart <= config.max_geo_distance_m && similarity >= config.fallback_name_threshold {
            return true;
        }
    }

    false
}

/// Collapse near-duplicate candidates within one category
///
/// # Algorithm
/// Single greedy pass in input order. Each unclaimed candidate seeds a group
/// and claims every later unclaimed candidate that matches the seed. Each
/// group is replaced by its member with the strictly smallest origin
/// distance (earliest wins ties). Output keeps the order of the seeds.
pub fn merge_similar_pois(pois: Vec<PoiCandidate>, config: &MatchConfig) -> Vec<PoiCandidate> {
    if pois.len() <= 1 {
        return pois;
    }

    let mut claimed = vec![false; pois.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for i in 0..pois.len() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let mut group = vec![i];

        for j in (i + 1)..pois.len() {
            if !claimed[j] && is_same_location(&pois[i], &pois[j], config) {
                claimed[j] = true;
                group.push(j);
            }
        }
        groups.push(group);
    }

    let best: Vec<usize> = groups
        .iter()
        .map(|group| {
            let mut best = group[0];
            for &idx in &group[1..] {
                if origin_distance(&pois[idx]) < origin_distance(&pois[best]) {
                    best = idx;
                }
            }
            if group.len() > 1 {
                debug!(
                    kept = %pois[best].name,
                    merged = group.len(),
                    "merged near-duplicate candidates"
                );
            }
            best
        })
        .collect();

    let mut slots: Vec<Option<PoiCandidate>> = pois.into_iter().map(Some).collect();
    best.into_iter().filter_map(|idx| slots[idx].take()).collect()
}

/// Apply [`merge_similar_pois`] to every category independently
pub fn merge_all_categories(
    results: BTreeMap<String, Vec<PoiCandidate>>,
    config: &MatchConfig,
) -> BTreeMap<String, Vec<PoiCandidate>> {
    results
        .into_iter()
        .map(|(label, pois)| (label, merge_similar_pois(pois, config)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, Reading};

    fn poi(name: &str, distance: &str) -> PoiCandidate {
        PoiCandidate {
            category: "地铁站".to_string(),
            name: name.to_string(),
            address: String::new(),
            coordinates: None,
            distance: Reading::Available(distance.to_string()),
            driving: Reading::Unavailable,
            transit: Reading::Unavailable,
            cycling: Reading::Unavailable,
        }
    }

    fn at(mut p: PoiCandidate, lng: f64, lat: f64) -> PoiCandidate {
        p.coordinates = Some(Coordinates::new(lng, lat));
        p
    }

    #[test]
    fn test_line_prefix_variants_merge_keeping_nearest() {
        let config = MatchConfig::default();
        let merged = merge_similar_pois(
            vec![
                poi("Line 10 Sanlitun Station", "500米"),
                poi("Sanlitun Station", "520米"),
            ],
            &config,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Line 10 Sanlitun Station");
        assert_eq!(merged[0].distance.to_string(), "500米");
    }

    #[test]
    fn test_nearer_later_candidate_becomes_representative() {
        let config = MatchConfig::default();
        let merged = merge_similar_pois(
            vec![poi("三里屯站", "520米"), poi("地铁10号线三里屯站", "480米")],
            &config,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "地铁10号线三里屯站");
    }

    #[test]
    fn test_distance_window_is_decisive() {
        let config = MatchConfig::default();
        let a = poi("Sanlitun Station", "500米");
        let b = poi("Sanlitun Station", "700米");
        assert!(!is_same_location(&a, &b, &config));

        let merged = merge_similar_pois(vec![a, b], &config);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let config = MatchConfig::default();
        assert!(is_same_location(
            &poi("团结湖站", "500米"),
            &poi("团结湖站", "600米"),
            &config
        ));
    }

    #[test]
    fn test_geo_fallback_needs_coordinates_and_loose_name() {
        let config = MatchConfig::default();
        // similarity 0.67: below 0.7, above 0.5
        let a = poi("朝阳公园南门", "800米");
        let b = poi("朝阳公园北", "820米");
        assert!(!is_same_location(&a, &b, &config));

        let a = at(a, 116.4787, 39.9441);
        let b = at(b, 116.4787, 39.9447);
        assert!(is_same_location(&a, &b, &config));

        // too far apart on the ground
        let c = at(poi("朝阳公园北", "820米"), 116.4787, 39.9500);
        assert!(!is_same_location(&a, &c, &config));
    }

    #[test]
    fn test_geo_window_boundary_is_inclusive() {
        let a = at(poi("朝阳公园南门", "800米"), 116.4787, 39.9441);
        let b = at(poi("朝阳公园北", "820米"), 116.4787, 39.9447);
        let apart = geo_distance_meters(a.location().unwrap(), b.location().unwrap());

        let exact = MatchConfig {
            max_geo_distance_m: apart,
            ..MatchConfig::default()
        };
        assert!(is_same_location(&a, &b, &exact));

        let just_short = MatchConfig {
            max_geo_distance_m: apart - 1e-6,
            ..MatchConfig::default()
        };
        assert!(!is_same_location(&a, &b, &just_short));
    }

    #[test]
    fn test_geo_fallback_reads_coordinates_from_address() {
        let config = MatchConfig::default();
        let mut a = poi("朝阳公园南门", "800米");
        a.address = "116.4787,39.9441".to_string();
        let mut b = poi("朝阳公园北", "820米");
        b.address = "经度：116.4787 纬度：39.9447".to_string();
        assert!(is_same_location(&a, &b, &config));
    }

    #[test]
    fn test_unparseable_distance_counts_as_zero() {
        let config = MatchConfig::default();
        let mut a = poi("三里屯站", "N/A");
        a.distance = Reading::Unavailable;
        let b = poi("三里屯站", "80米");
        assert!(is_same_location(&a, &b, &config));

        let far = poi("三里屯站", "300米");
        assert!(!is_same_location(&a, &far, &config));
    }

    #[test]
    fn test_ties_keep_earliest() {
        let config = MatchConfig::default();
        let mut first = poi("三里屯站", "500米");
        first.address = "first".to_string();
        let mut second = poi("三里屯站", "500米");
        second.address = "second".to_string();

        let merged = merge_similar_pois(vec![first, second], &config);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].address, "first");
    }

    #[test]
    fn test_output_follows_seed_order() {
        let config = MatchConfig::default();
        let merged = merge_similar_pois(
            vec![
                poi("团结湖站", "900米"),
                poi("Sanlitun Station", "500米"),
                poi("团结湖站", "880米"),
                poi("农业展览馆站", "1.2公里"),
                poi("Line 10 Sanlitun Station", "450米"),
            ],
            &config,
        );
        let names: Vec<_> = merged.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["团结湖站", "Line 10 Sanlitun Station", "农业展览馆站"]);
        assert_eq!(merged[0].distance.to_string(), "880米");
    }

    #[test]
    fn test_merge_is_idempotent_for_separated_groups() {
        let config = MatchConfig::default();
        let input = vec![
            poi("Line 10 Sanlitun Station", "500米"),
            poi("Tuanjiehu Station", "900米"),
            poi("Sanlitun Station", "520米"),
            poi("Sanlitun Station", "700米"),
            poi("Tuanjiehu", "950米"),
        ];
        let once = merge_similar_pois(input, &config);
        let twice = merge_similar_pois(once.clone(), &config);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_chained_distances_merge_again_on_second_pass() {
        // 500 claims 400 but not 310; the kept 400 is within the window of 310
        let config = MatchConfig::default();
        let input = vec![
            poi("三里屯站", "500米"),
            poi("三里屯站", "400米"),
            poi("三里屯站", "310米"),
        ];

        let once = merge_similar_pois(input, &config);
        let distances: Vec<_> = once.iter().map(|p| p.distance.to_string()).collect();
        assert_eq!(distances, vec!["400米", "310米"]);

        let twice = merge_similar_pois(once, &config);
        let distances: Vec<_> = twice.iter().map(|p| p.distance.to_string()).collect();
        assert_eq!(distances, vec!["310米"]);
    }

    #[test]
    fn test_empty_and_single_pass_through() {
        let config = MatchConfig::default();
        assert!(merge_similar_pois(Vec::new(), &config).is_empty());

        let single = vec![poi("三里屯站", "500米")];
        assert_eq!(merge_similar_pois(single.clone(), &config), single);
    }

    #[test]
    fn test_categories_never_interact() {
        let config = MatchConfig::default();
        let mut results = BTreeMap::new();
        results.insert(
            "地铁站".to_string(),
            vec![poi("三里屯站", "500米"), poi("三里屯站", "510米")],
        );
        let mut museum = poi("三里屯站", "505米");
        museum.category = "博物馆".to_string();
        results.insert("博物馆".to_string(), vec![museum]);
        results.insert("公园".to_string(), Vec::new());

        let merged = merge_all_categories(results, &config);
        assert_eq!(merged["地铁站"].len(), 1);
        assert_eq!(merged["博物馆"].len(), 1);
        assert!(merged["公园"].is_empty());
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let strict = MatchConfig {
            name_threshold: 0.95,
            ..MatchConfig::default()
        };
        let a = poi("三里屯站", "500米");
        let b = poi("三里屯北站", "510米");
        assert!(is_same_location(&a, &b, &MatchConfig::default()));
        assert!(!is_same_location(&a, &b, &strict));
    }
}
