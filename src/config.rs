//! Configuration management for `StreetScout`
//!
//! Handles loading configuration from files and environment variables,
//! and provides validation for all configuration settings.

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StreetScoutError};
use crate::mapillary::ImageResolution;

/// Root configuration structure for `StreetScout`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetScoutConfig {
    /// Mapillary Graph API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Image download configuration
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Reverse geocoding configuration
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Graph API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Mapillary access token
    pub token: Option<String>,
    /// Base URL for the Graph API
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Image download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Thumbnail resolution (`256`, `1024`, `2048`, or `original`)
    #[serde(default = "default_resolution")]
    pub resolution: String,
    /// Concurrent image fetches; available parallelism when unset
    pub parallel_fetches: Option<usize>,
    /// Concurrent region searches; available parallelism when unset
    pub parallel_searches: Option<usize>,
    /// Minimum downloads handed to one worker at a time
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Reverse geocoding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Base URL for the Nominatim API
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_api_base_url() -> String {
    "https://graph.mapillary.com".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_user_agent() -> String {
    "StreetScout/0.1.0".to_string()
}

fn default_resolution() -> String {
    "original".to_string()
}

fn default_batch_size() -> usize {
    1
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_api_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            parallel_fetches: None,
            parallel_searches: None,
            batch_size: default_batch_size(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StreetScoutConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            fetch: FetchConfig::default(),
            geocoding: GeocodingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Access token, or a configuration error when none is set
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                StreetScoutError::Config(
                    "Mapillary access token is required. Set api.token in the config file or STREETSCOUT_API__TOKEN.".to_string(),
                )
            })
    }
}

impl StreetScoutConfig {
    /// Load configuration from the default file location and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides, e.g. STREETSCOUT_API__TOKEN
        builder = builder.add_source(
            Environment::with_prefix("STREETSCOUT")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| StreetScoutError::Config(format!("Failed to build configuration: {e}")))?;

        let mut config: StreetScoutConfig = settings.try_deserialize().map_err(|e| {
            StreetScoutError::Config(format!("Failed to deserialize configuration: {e}"))
        })?;

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("streetscout").join("config.toml"))
    }

    /// Apply default values to fields that deserialized to empty or zero
    pub fn apply_defaults(&mut self) {
        if self.api.base_url.is_empty() {
            self.api.base_url = default_api_base_url();
        }
        if self.api.timeout_seconds == 0 {
            self.api.timeout_seconds = default_timeout();
        }
        if self.api.user_agent.is_empty() {
            self.api.user_agent = default_user_agent();
        }
        if self.fetch.resolution.is_empty() {
            self.fetch.resolution = default_resolution();
        }
        if self.fetch.batch_size == 0 {
            self.fetch.batch_size = default_batch_size();
        }
        if self.geocoding.base_url.is_empty() {
            self.geocoding.base_url = default_geocoding_base_url();
        }
        if self.geocoding.timeout_seconds == 0 {
            self.geocoding.timeout_seconds = default_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        if let Some(token) = &self.api.token {
            if token.is_empty() {
                return Err(StreetScoutError::Config(
                    "Access token cannot be empty if provided. Either remove it or provide a valid token.".to_string(),
                ));
            }
        }

        if self.api.timeout_seconds > 300 || self.geocoding.timeout_seconds > 300 {
            return Err(StreetScoutError::Config(
                "Request timeout cannot exceed 300 seconds".to_string(),
            ));
        }

        if ImageResolution::from_name(&self.fetch.resolution).is_none() {
            return Err(StreetScoutError::Config(format!(
                "Unknown image resolution '{}'. Expected 256, 1024, 2048, or original.",
                self.fetch.resolution
            )));
        }

        if self.fetch.parallel_fetches == Some(0) {
            return Err(StreetScoutError::Config(
                "parallel_fetches must be at least 1".to_string(),
            ));
        }

        if self.fetch.parallel_searches == Some(0) {
            return Err(StreetScoutError::Config(
                "parallel_searches must be at least 1".to_string(),
            ));
        }

        const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(StreetScoutError::Config(format!(
                "Unknown log level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StreetScoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.base_url, "https://graph.mapillary.com");
        assert_eq!(config.fetch.batch_size, 1);
        assert_eq!(config.fetch.resolution, "original");
        assert!(config.fetch.parallel_fetches.is_none());
    }

    #[test]
    fn test_require_token() {
        let mut config = StreetScoutConfig::default();
        assert!(config.api.require_token().is_err());

        config.api.token = Some("MLY|12345|abcdef".to_string());
        assert_eq!(config.api.require_token().unwrap(), "MLY|12345|abcdef");
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let mut config = StreetScoutConfig::default();
        config.api.token = Some(String::new());
        assert!(matches!(
            config.validate(),
            Err(StreetScoutError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_resolution_is_rejected() {
        let mut config = StreetScoutConfig::default();
        config.fetch.resolution = "512".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_parallelism_is_rejected() {
        let mut config = StreetScoutConfig::default();
        config.fetch.parallel_fetches = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_repairs_empty_fields() {
        let mut config = StreetScoutConfig::default();
        config.api.base_url = String::new();
        config.api.timeout_seconds = 0;
        config.fetch.batch_size = 0;
        config.apply_defaults();
        assert_eq!(config.api.base_url, "https://graph.mapillary.com");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.fetch.batch_size, 1);
    }

    #[test]
    fn test_timeout_range_check() {
        let mut config = StreetScoutConfig::default();
        config.api.timeout_seconds = 301;
        assert!(config.validate().is_err());
    }
}
