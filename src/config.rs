//! Configuration management for `WeatherWatch`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::WeatherWatchError;
use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Widest history window a query may span, about ten years
const MAX_HISTORY_DAYS: u32 = 3_660;

/// Root configuration structure for the `WeatherWatch` service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherWatchConfig {
    /// Observation source configuration
    pub source: SourceConfig,
    /// Summary store configuration
    pub store: StoreConfig,
    /// Alerting configuration
    pub alerts: AlertConfig,
    /// Polling configuration
    pub poller: PollerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// HTTP query surface
    pub web: WebConfig,
}

/// OpenWeatherMap API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL for the weather API
    pub base_url: String,
    /// API key; falls back to `OPENWEATHER_API_KEY`
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database directory
    pub location: String,
    /// Timeout for one read-modify-write in seconds
    pub timeout_seconds: u32,
    /// Oldest day a history query may reach back to
    pub history_max_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Breach threshold in Celsius
    pub temperature_threshold: f64,
    /// Consecutive breaching polls needed before an alert is reported
    pub confirmation_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Poll interval in milliseconds
    pub interval_ms: u64,
    /// Monitored cities
    pub cities: Vec<String>,
    /// IANA timezone that defines the calendar day
    pub timezone: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
    /// OTLP/HTTP collector base URL, e.g. `http://localhost:4318`
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub port: u16,
}

// Default value functions
fn default_source_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_source_timeout() -> u32 {
    10
}

fn default_store_location() -> String {
    "./data/weatherwatch".to_string()
}

fn default_store_timeout() -> u32 {
    5
}

fn default_history_max_days() -> u32 {
    366
}

fn default_temperature_threshold() -> f64 {
    35.0
}

fn default_confirmation_threshold() -> u32 {
    2
}

fn default_interval_ms() -> u64 {
    300_000
}

fn default_cities() -> Vec<String> {
    ["Hyderabad", "Chennai", "Bangalore", "Mumbai", "Delhi"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_base_url(),
            api_key: None,
            timeout_seconds: default_source_timeout(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: default_store_location(),
            timeout_seconds: default_store_timeout(),
            history_max_days: default_history_max_days(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            temperature_threshold: default_temperature_threshold(),
            confirmation_threshold: default_confirmation_threshold(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            cities: default_cities(),
            timezone: default_timezone(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl WeatherWatchConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. WEATHERWATCH_ALERTS__CONFIRMATION_THRESHOLD=1
        builder = builder.add_source(
            Environment::with_prefix("WEATHERWATCH")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("poller.cities")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: WeatherWatchConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        if config.source.api_key.is_none() {
            config.source.api_key = std::env::var("OPENWEATHER_API_KEY").ok();
        }

        // Apply defaults for missing values
        config.apply_defaults();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weatherwatch").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.source.base_url.is_empty() {
            self.source.base_url = default_source_base_url();
        }
        if self.store.location.is_empty() {
            self.store.location = default_store_location();
        }
        if self.store.history_max_days == 0 {
            self.store.history_max_days = default_history_max_days();
        }
        if self.poller.interval_ms == 0 {
            self.poller.interval_ms = default_interval_ms();
        }
        if self.poller.timezone.is_empty() {
            self.poller.timezone = default_timezone();
        }
        self.poller.cities = self
            .poller
            .cities
            .iter()
            .map(|city| city.trim().to_string())
            .filter(|city| !city.is_empty())
            .collect();
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_cities()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_cities(&self) -> Result<()> {
        if self.poller.cities.is_empty() {
            return Err(WeatherWatchError::config("At least one city must be configured").into());
        }

        let mut seen = HashSet::new();
        for city in &self.poller.cities {
            if !seen.insert(city.to_lowercase()) {
                return Err(
                    WeatherWatchError::config(format!("City '{city}' is configured twice")).into(),
                );
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if !self.alerts.temperature_threshold.is_finite() {
            return Err(
                WeatherWatchError::config("Alert temperature threshold must be a finite number")
                    .into(),
            );
        }

        if !(1..=10).contains(&self.alerts.confirmation_threshold) {
            return Err(WeatherWatchError::config(
                "Alert confirmation threshold must be between 1 and 10",
            )
            .into());
        }

        if self.poller.interval_ms < 1_000 {
            return Err(
                WeatherWatchError::config("Poll interval cannot be below 1000 ms").into(),
            );
        }

        if !(1..=300).contains(&self.source.timeout_seconds) {
            return Err(WeatherWatchError::config(
                "Weather API timeout must be between 1 and 300 seconds",
            )
            .into());
        }

        if !(1..=300).contains(&self.store.timeout_seconds) {
            return Err(
                WeatherWatchError::config("Store timeout must be between 1 and 300 seconds").into(),
            );
        }

        if self.store.history_max_days > MAX_HISTORY_DAYS {
            return Err(WeatherWatchError::config(format!(
                "History window cannot exceed {MAX_HISTORY_DAYS} days"
            ))
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherWatchError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherWatchError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.source.base_url.starts_with("http://")
            && !self.source.base_url.starts_with("https://")
        {
            return Err(WeatherWatchError::config(
                "Weather API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.poller.timezone.parse::<Tz>().is_err() {
            return Err(WeatherWatchError::config(format!(
                "Unknown timezone '{}'",
                self.poller.timezone
            ))
            .into());
        }

        Ok(())
    }

    /// Reference timezone for day keys. Falls back to UTC if the name does not parse.
    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.poller.timezone.parse().unwrap_or(Tz::UTC)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poller.interval_ms)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.into())
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_seconds.into())
    }
}
