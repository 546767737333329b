//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use startpage_core::config::{CoreConfig, HashParams};
use tracing::Level;

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where the document and the sessions live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// A JSON file on disk and an in-process session map with a sweeper.
    Filesystem,
    /// A key-value namespace with native per-key expiry.
    KeyValue,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fs" | "file" | "filesystem" => Ok(Self::Filesystem),
            "kv" => Ok(Self::KeyValue),
            other => Err(format!("'{other}' is not one of fs, kv")),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub storage: StorageBackend,
    pub data_path: PathBuf,
    pub kv_document_key: String,
    pub session_sweep_interval: Duration,
    pub weather_cache_ttl: Duration,
    pub geocoding_url: String,
    pub forecast_url: String,
    pub public_dir: Option<PathBuf>,
    pub cors_origin: Option<String>,
    pub core: CoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: Level::INFO,
            storage: StorageBackend::Filesystem,
            data_path: PathBuf::from("data/navigation.json"),
            kv_document_key: "navigation".to_string(),
            session_sweep_interval: Duration::from_secs(600),
            weather_cache_ttl: Duration::from_secs(600),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            public_dir: None,
            cors_origin: None,
            core: CoreConfig::default(),
        }
    }
}

/// Reads and parses an optional variable.
fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(None),
    }
}

/// Durations that drive expiry or a timer must be positive.
fn non_zero_secs(name: &str, secs: Option<u64>) -> Result<Option<Duration>, ConfigError> {
    match secs {
        Some(0) => Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        )),
        other => Ok(other.map(Duration::from_secs)),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Self::default();

        // --- Server Settings ---
        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS")?.unwrap_or(defaults.bind_address);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Storage Settings ---
        let storage = match std::env::var("STORAGE_BACKEND") {
            Ok(raw) => raw
                .parse::<StorageBackend>()
                .map_err(|e| ConfigError::InvalidValue("STORAGE_BACKEND".to_string(), e))?,
            Err(_) => defaults.storage,
        };
        let data_path = std::env::var("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);
        let kv_document_key = non_empty_var("KV_DOCUMENT_KEY").unwrap_or(defaults.kv_document_key);
        let session_sweep_interval =
            non_zero_secs("SESSION_SWEEP_SECS", parse_var::<u64>("SESSION_SWEEP_SECS")?)?
                .unwrap_or(defaults.session_sweep_interval);

        // --- Core Defaults ---
        let core_defaults = CoreConfig::default();
        let session_ttl = non_zero_secs("SESSION_TTL_SECS", parse_var::<u64>("SESSION_TTL_SECS")?)?
            .unwrap_or(core_defaults.session_ttl);
        let core = CoreConfig {
            default_admin_password: non_empty_var("DEFAULT_ADMIN_PASSWORD")
                .unwrap_or(core_defaults.default_admin_password),
            session_ttl,
            default_weather_city: non_empty_var("DEFAULT_WEATHER_CITY")
                .unwrap_or(core_defaults.default_weather_city),
            default_site_name: non_empty_var("DEFAULT_SITE_NAME")
                .unwrap_or(core_defaults.default_site_name),
            weather_timeout: parse_var::<u64>("WEATHER_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(core_defaults.weather_timeout),
            weather_max_retries: parse_var::<u32>("WEATHER_MAX_RETRIES")?
                .unwrap_or(core_defaults.weather_max_retries),
            hash_params: HashParams::default(),
        };

        // --- Weather Provider ---
        let weather_cache_ttl = parse_var::<u64>("WEATHER_CACHE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.weather_cache_ttl);
        let geocoding_url = non_empty_var("GEOCODING_URL").unwrap_or(defaults.geocoding_url);
        let forecast_url = non_empty_var("FORECAST_URL").unwrap_or(defaults.forecast_url);

        // --- Front End ---
        let public_dir = non_empty_var("PUBLIC_DIR").map(PathBuf::from);
        let cors_origin = non_empty_var("CORS_ORIGIN");

        Ok(Self {
            bind_address,
            log_level,
            storage,
            data_path,
            kv_document_key,
            session_sweep_interval,
            weather_cache_ttl,
            geocoding_url,
            forecast_url,
            public_dir,
            cors_origin,
            core,
        })
    }
}
