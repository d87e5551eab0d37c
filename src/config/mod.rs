use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::ThrottleConfig;
use crate::domain::Category;
use crate::error::ConfigError;
use crate::matching::MatchConfig;

fn default_base_url() -> String {
    "https://restapi.amap.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_radius_m() -> u32 {
    10000
}
fn default_max_results() -> u32 {
    3
}
fn default_categories() -> Vec<Category> {
    Category::defaults()
}
fn default_verbose() -> bool {
    false
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API key; `--key` and `AMAP_KEY` take precedence
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct SearchSection {
    /// Search radius around the geocoded origin, in meters
    #[serde(default = "default_radius_m")]
    pub radius_m: u32,
    /// Places requested per category
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            radius_m: default_radius_m(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            throttle: ThrottleConfig::default(),
            search: SearchSection::default(),
            matching: MatchConfig::default(),
            categories: default_categories(),
            verbose: default_verbose(),
        }
    }
}

impl FileConfig {
    /// First config file found in the search path that parses, plus the
    /// errors of any files skipped before it.
    ///
    /// Skipped files are returned rather than logged so the caller can report
    /// them once logging is set up.
    pub fn load() -> (Option<Self>, Vec<ConfigError>) {
        Self::load_from(&get_config_paths())
    }

    pub fn load_from(paths: &[PathBuf]) -> (Option<Self>, Vec<ConfigError>) {
        let mut skipped = Vec::new();
        for path in paths {
            if path.exists() {
                match Self::from_path(path) {
                    Ok(config) => return (Some(config), skipped),
                    Err(e) => skipped.push(e),
                }
            }
        }
        (None, skipped)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject settings the search cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.throttle.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "throttle.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.search.max_results == 0 {
            return Err(ConfigError::Invalid(
                "search.max_results must be at least 1".to_string(),
            ));
        }

        let m = &self.matching;
        for (name, value) in [
            ("matching.name_threshold", m.name_threshold),
            ("matching.fallback_name_threshold", m.fallback_name_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("matching.max_origin_distance_delta_m", m.max_origin_distance_delta_m),
            ("matching.max_geo_distance_m", m.max_geo_distance_m),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if self.categories.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one category is required".to_string(),
            ));
        }
        if let Some(bad) = self
            .categories
            .iter()
            .find(|c| c.label.trim().is_empty() || c.code.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "category label and code must be non-empty: {:?}",
                bad
            )));
        }
        Ok(())
    }
}

pub fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("nearpoi.toml"));
    paths.push(PathBuf::from(".nearpoi.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("nearpoi").join("config.toml"));
        paths.push(config_dir.join("nearpoi.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".nearpoi.toml"));
    }

    paths
}
