//! crates/startpage_core/src/config.rs
//!
//! Explicit defaults for the core. Every constant the document and session
//! logic depends on lives here and is passed to constructors.

use std::time::Duration;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);
pub const DEFAULT_WEATHER_CITY: &str = "北京";
pub const DEFAULT_SITE_NAME: &str = "我的导航";
pub const DEFAULT_WEATHER_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_WEATHER_MAX_RETRIES: u32 = 3;

/// Cost parameters for the password KDF (Argon2id).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl HashParams {
    /// Minimal parameters for tests. Not for production credentials.
    pub fn low_cost() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub default_admin_password: String,
    pub session_ttl: Duration,
    pub default_weather_city: String,
    pub default_site_name: String,
    pub weather_timeout: Duration,
    pub weather_max_retries: u32,
    pub hash_params: HashParams,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
            default_weather_city: DEFAULT_WEATHER_CITY.to_string(),
            default_site_name: DEFAULT_SITE_NAME.to_string(),
            weather_timeout: DEFAULT_WEATHER_TIMEOUT,
            weather_max_retries: DEFAULT_WEATHER_MAX_RETRIES,
            hash_params: HashParams::default(),
        }
    }
}
