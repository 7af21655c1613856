//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development. A `.env` file in the working
//! directory is read first when present.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use townboard_shared::constants::{
    APP_NAME, DEFAULT_CACHE_TTL_SECS, DEFAULT_HTTP_PORT, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_BASE_MS, DEFAULT_RETRY_MAX_MS,
};
use townboard_store::RetryPolicy;

/// Where the record store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Platform data directory (`directories`).
    Default,
    /// Explicit file path.
    Path(PathBuf),
    /// Throwaway in-process database (`:memory:`).
    InMemory,
}

/// The single moderator login.
#[derive(Clone, PartialEq, Eq)]
pub struct ModeratorCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ModeratorCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeratorCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Env: `DATABASE_PATH` (`:memory:` for an in-process store)
    /// Default: platform data directory.
    pub database: DatabaseLocation,

    /// Human-readable name for this portal.
    /// Env: `INSTANCE_NAME`
    pub instance_name: String,

    /// Env: `MODERATOR_USERNAME` + `MODERATOR_PASSWORD`.
    /// Both must be set, otherwise the moderator API is disabled.
    pub moderator: Option<ModeratorCredentials>,

    /// Branding shown by `/info`.
    /// Env: `LOGO_URL`, `BANNER_URL`
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,

    /// Read cache time-to-live. Zero disables the cache.
    /// Env: `CACHE_TTL_SECS`
    /// Default: 30 s
    pub cache_ttl: Duration,

    /// Env: `STORE_RETRY_ATTEMPTS`, `STORE_RETRY_BASE_MS`, `STORE_RETRY_MAX_MS`
    pub retry_attempts: u32,
    pub retry_base: Duration,
    pub retry_max: Duration,

    /// Refuse a second rating from the same email for the same target.
    /// Env: `RATINGS_ONE_PER_RATER` (true/false)
    /// Default: `false`
    pub ratings_one_per_rater: bool,

    /// Per-IP token bucket on the public submission routes.
    /// Env: `RATE_LIMIT_PER_SEC`, `RATE_LIMIT_BURST`
    /// Default: 5 req/s, burst of 20
    pub rate_limit_per_sec: f64,
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database: DatabaseLocation::Default,
            instance_name: APP_NAME.to_string(),
            moderator: None,
            logo_url: None,
            banner_url: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base: Duration::from_millis(DEFAULT_RETRY_BASE_MS),
            retry_max: Duration::from_millis(DEFAULT_RETRY_MAX_MS),
            ratings_one_per_rater: false,
            rate_limit_per_sec: 5.0,
            rate_limit_burst: 20.0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Could not read .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Invalid values are logged and
    /// replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(addr) = var("HTTP_ADDR") {
            config.http_addr = parse_or(&addr, "HTTP_ADDR", config.http_addr);
        }

        if let Some(path) = var("DATABASE_PATH") {
            config.database = if path == ":memory:" {
                DatabaseLocation::InMemory
            } else {
                DatabaseLocation::Path(PathBuf::from(path))
            };
        }

        if let Some(name) = var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        match (var("MODERATOR_USERNAME"), lookup("MODERATOR_PASSWORD")) {
            (Some(username), Some(password)) if !password.is_empty() => {
                config.moderator = Some(ModeratorCredentials { username, password });
            }
            (None, None) => {}
            _ => tracing::warn!(
                "MODERATOR_USERNAME and MODERATOR_PASSWORD must both be set; moderator API disabled"
            ),
        }

        config.logo_url = var("LOGO_URL");
        config.banner_url = var("BANNER_URL");

        if let Some(val) = var("CACHE_TTL_SECS") {
            config.cache_ttl =
                Duration::from_secs(parse_or(&val, "CACHE_TTL_SECS", config.cache_ttl.as_secs()));
        }

        if let Some(val) = var("STORE_RETRY_ATTEMPTS") {
            config.retry_attempts = parse_or(&val, "STORE_RETRY_ATTEMPTS", config.retry_attempts);
        }
        if let Some(val) = var("STORE_RETRY_BASE_MS") {
            config.retry_base = Duration::from_millis(parse_or(
                &val,
                "STORE_RETRY_BASE_MS",
                DEFAULT_RETRY_BASE_MS,
            ));
        }
        if let Some(val) = var("STORE_RETRY_MAX_MS") {
            config.retry_max = Duration::from_millis(parse_or(
                &val,
                "STORE_RETRY_MAX_MS",
                DEFAULT_RETRY_MAX_MS,
            ));
        }

        if let Some(val) = var("RATINGS_ONE_PER_RATER") {
            config.ratings_one_per_rater = val != "false" && val != "0";
        }

        if let Some(val) = var("RATE_LIMIT_PER_SEC") {
            config.rate_limit_per_sec = parse_positive(&val, "RATE_LIMIT_PER_SEC", config.rate_limit_per_sec);
        }
        if let Some(val) = var("RATE_LIMIT_BURST") {
            config.rate_limit_burst = parse_positive(&val, "RATE_LIMIT_BURST", config.rate_limit_burst);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            base_delay: self.retry_base,
            max_delay: self.retry_max,
        }
    }
}

fn parse_or<T: FromStr + Copy>(value: &str, key: &str, default: T) -> T {
    value.parse().unwrap_or_else(|_| {
        tracing::warn!(key, value, "Invalid setting, using default");
        default
    })
}

fn parse_positive(value: &str, key: &str, default: f64) -> f64 {
    match value.parse::<f64>() {
        Ok(v) if v > 0.0 && v.is_finite() => v,
        _ => {
            tracing::warn!(key, value, "Invalid setting, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert!(config.moderator.is_none());
        assert!(!config.ratings_one_per_rater);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", ":memory:"),
            ("MODERATOR_USERNAME", "admin"),
            ("MODERATOR_PASSWORD", "s3cret"),
            ("CACHE_TTL_SECS", "0"),
            ("RATINGS_ONE_PER_RATER", "true"),
            ("LOGO_URL", "https://cdn.example.com/logo.png"),
        ]);
        assert_eq!(config.http_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.database, DatabaseLocation::InMemory);
        assert_eq!(config.moderator.as_ref().unwrap().username, "admin");
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert!(config.ratings_one_per_rater);
        assert_eq!(config.logo_url.as_deref(), Some("https://cdn.example.com/logo.png"));
        assert_eq!(config.banner_url, None);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("STORE_RETRY_ATTEMPTS", "many"),
            ("RATE_LIMIT_BURST", "-3"),
            ("MODERATOR_USERNAME", "admin"),
        ]);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.rate_limit_burst, 20.0);
        // Username without a password does not enable the moderator API.
        assert!(config.moderator.is_none());
    }

    #[test]
    fn test_password_is_not_logged() {
        let creds = ModeratorCredentials {
            username: "admin".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
