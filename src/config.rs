use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use crate::models::{MatchPreferences, ScoringWeights};
use crate::services::SearchSettings;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub directory: DirectorySettings,
    #[serde(default)]
    pub registry: RegistrySettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct DirectorySettings {
    #[serde(default = "default_directory_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_directory_dataset")]
    pub dataset: String,
    pub timeout_secs: Option<u64>,
    pub fetch_limit: Option<usize>,
    pub search_radius_km: Option<f64>,
    #[serde(default = "default_true")]
    pub vocational_only: bool,
    /// Serve schools from a JSON file instead of the live directory
    pub static_path: Option<String>,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            endpoint: default_directory_endpoint(),
            dataset: default_directory_dataset(),
            timeout_secs: None,
            fetch_limit: None,
            search_radius_km: None,
            vocational_only: true,
            static_path: None,
        }
    }
}

fn default_directory_endpoint() -> String {
    "https://data.education.gouv.fr/api/explore/v2.1".to_string()
}
fn default_directory_dataset() -> String {
    "fr-en-annuaire-education".to_string()
}
fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    #[serde(default = "default_registry_endpoint")]
    pub endpoint: String,
    pub timeout_secs: Option<u64>,
    /// Answer from the static dataset when the live registry fails
    #[serde(default = "default_true")]
    pub static_fallback: bool,
    /// JSON dataset replacing the built-in static sample
    pub fallback_path: Option<String>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            endpoint: default_registry_endpoint(),
            timeout_secs: None,
            static_fallback: true,
            fallback_path: None,
        }
    }
}

fn default_registry_endpoint() -> String {
    "https://recherche-entreprises.api.gouv.fr".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub capacity: Option<u64>,
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingSettings {
    pub max_distance_km: Option<f64>,
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_sector_base")]
    pub sector_base: u32,
    #[serde(default = "default_sector_step")]
    pub sector_step: u32,
    #[serde(default = "default_sector_cap")]
    pub sector_cap: u32,
    #[serde(default = "default_sector_name_bonus")]
    pub sector_name_bonus: u32,
    #[serde(default = "default_public_bonus")]
    pub public_bonus: u32,
    #[serde(default = "default_full_contact_bonus")]
    pub full_contact_bonus: u32,
    #[serde(default = "default_partial_contact_bonus")]
    pub partial_contact_bonus: u32,
    #[serde(default = "default_website_bonus")]
    pub website_bonus: u32,
    #[serde(default = "default_baseline_floor")]
    pub baseline_floor: u32,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            sector_base: default_sector_base(),
            sector_step: default_sector_step(),
            sector_cap: default_sector_cap(),
            sector_name_bonus: default_sector_name_bonus(),
            public_bonus: default_public_bonus(),
            full_contact_bonus: default_full_contact_bonus(),
            partial_contact_bonus: default_partial_contact_bonus(),
            website_bonus: default_website_bonus(),
            baseline_floor: default_baseline_floor(),
        }
    }
}

fn default_sector_base() -> u32 { 30 }
fn default_sector_step() -> u32 { 10 }
fn default_sector_cap() -> u32 { 60 }
fn default_sector_name_bonus() -> u32 { 10 }
fn default_public_bonus() -> u32 { 5 }
fn default_full_contact_bonus() -> u32 { 5 }
fn default_partial_contact_bonus() -> u32 { 3 }
fn default_website_bonus() -> u32 { 3 }
fn default_baseline_floor() -> u32 { 10 }

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        Self {
            sector_base: config.sector_base,
            sector_step: config.sector_step,
            sector_cap: config.sector_cap,
            sector_name_bonus: config.sector_name_bonus,
            public_bonus: config.public_bonus,
            full_contact_bonus: config.full_contact_bonus,
            partial_contact_bonus: config.partial_contact_bonus,
            website_bonus: config.website_bonus,
            baseline_floor: config.baseline_floor,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with LYCEE__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., LYCEE__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("LYCEE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("LYCEE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights::from(&self.scoring.weights)
    }

    /// Search knobs with defaults applied
    pub fn search_settings(&self) -> SearchSettings {
        let fallback = SearchSettings::default();
        let max_results_cap = self.matching.max_limit.unwrap_or(fallback.max_results_cap).max(1);

        SearchSettings {
            defaults: MatchPreferences {
                max_distance_km: self
                    .matching
                    .max_distance_km
                    .filter(|km| *km > 0.0)
                    .unwrap_or(fallback.defaults.max_distance_km),
                max_results: self
                    .matching
                    .default_limit
                    .unwrap_or(fallback.defaults.max_results)
                    .clamp(1, max_results_cap),
                ..fallback.defaults
            },
            max_results_cap,
            fetch_limit: self.directory.fetch_limit.unwrap_or(fallback.fetch_limit),
            search_radius_km: self.directory.search_radius_km.unwrap_or(fallback.search_radius_km),
            vocational_only: self.directory.vocational_only,
        }
    }
}
