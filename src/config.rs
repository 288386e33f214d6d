use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub profiles: ProfileStoreSettings,
    pub collection: CollectionSettings,
    #[serde(default)]
    pub push: PushSettings,
    #[serde(default)]
    pub presence: PresenceSettings,
    #[serde(default)]
    pub request: RequestSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileStoreSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_capacity() -> u64 { 1000 }
fn default_cache_ttl_secs() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub agents: String,
    pub listings: String,
    pub matches: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushSettings {
    #[serde(default = "default_expo_url")]
    pub expo_url: String,
    #[serde(default = "default_fcm_url")]
    pub fcm_url: String,
    #[serde(default)]
    pub fcm_server_key: Option<String>,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            expo_url: default_expo_url(),
            fcm_url: default_fcm_url(),
            fcm_server_key: None,
        }
    }
}

fn default_expo_url() -> String {
    "https://exp.host/--/api/v2/push/send".to_string()
}
fn default_fcm_url() -> String {
    "https://fcm.googleapis.com/fcm/send".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresenceSettings {
    #[serde(default = "default_presence_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_presence_ttl_secs(),
        }
    }
}

fn default_presence_ttl_secs() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct RequestSettings {
    #[serde(default = "default_request_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_offer_ttl_secs")]
    pub offer_ttl_secs: u64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_request_ttl_secs(),
            offer_ttl_secs: default_offer_ttl_secs(),
        }
    }
}

fn default_request_ttl_secs() -> u64 { 600 }
fn default_offer_ttl_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_avg_speed_kmh")]
    pub avg_speed_kmh: f64,
    #[serde(default)]
    pub weights: WeightsConfig,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            avg_speed_kmh: default_avg_speed_kmh(),
            weights: WeightsConfig::default(),
        }
    }
}

fn default_avg_speed_kmh() -> f64 { 40.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_eta_weight")]
    pub eta: f64,
    #[serde(default = "default_load_weight")]
    pub load: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            eta: default_eta_weight(),
            load: default_load_weight(),
            rating: default_rating_weight(),
        }
    }
}

fn default_eta_weight() -> f64 { 0.7 }
fn default_load_weight() -> f64 { 0.2 }
fn default_rating_weight() -> f64 { 0.1 }

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
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with DISPATCH_)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            // Add default config file
            .add_source(File::with_name("config/default").required(false))
            // Add local config file (for development overrides)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with DISPATCH_)
            // e.g., DISPATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("DISPATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("DISPATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = WeightsConfig::default();
        assert_eq!(weights.eta, 0.7);
        assert_eq!(weights.load, 0.2);
        assert_eq!(weights.rating, 0.1);
    }

    #[test]
    fn test_default_ttls() {
        assert_eq!(PresenceSettings::default().ttl_secs, 60);
        let request = RequestSettings::default();
        assert_eq!(request.ttl_secs, 600);
        assert_eq!(request.offer_ttl_secs, 30);
    }

    #[test]
    fn test_default_scoring() {
        let scoring = ScoringSettings::default();
        assert_eq!(scoring.avg_speed_kmh, 40.0);
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }
}
