/*
 * Responsibility
 * - Read process configuration from the environment (.env supported)
 * - Validate values up front (missing/invalid => startup fails)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::auth::gate::{AuthorityFailurePolicy, GatePolicy};
use crate::services::cache::ValkeySettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            _ => Err(ConfigError::Invalid("APP_ENV")),
        }
    }
}

impl AppEnv {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Valkey,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "valkey" | "redis" => Ok(Self::Valkey),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("CACHE_BACKEND")),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub auth_url: String,
    pub auth_connect_timeout: Duration,
    pub auth_request_timeout: Duration,

    pub cache_backend: CacheBackend,
    pub cache: ValkeySettings,

    pub gate: GatePolicy,

    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(&get, "PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = match get("APP_ENV") {
            Some(v) => v.parse::<AppEnv>()?,
            None => AppEnv::Development,
        };

        let auth_url = get("AUTH_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_URL"))?;
        url::Url::parse(&auth_url).map_err(|_| ConfigError::Invalid("AUTH_URL"))?;

        let auth_connect_timeout =
            Duration::from_millis(parse_or(&get, "AUTH_CONNECT_TIMEOUT_MS", 2000)?);
        let auth_request_timeout =
            Duration::from_millis(parse_or(&get, "AUTH_REQUEST_TIMEOUT_MS", 5000)?);

        let on_authority_failure = match get("AUTHORITY_FAILURE_POLICY") {
            Some(v) => v
                .parse::<AuthorityFailurePolicy>()
                .map_err(|err| {
                    tracing::error!(error = %err, "unknown AUTHORITY_FAILURE_POLICY");
                    ConfigError::Invalid("AUTHORITY_FAILURE_POLICY")
                })?,
            None => AuthorityFailurePolicy::FailClosed,
        };

        let cache_backend = match get("CACHE_BACKEND") {
            Some(v) => v.parse::<CacheBackend>()?,
            None => CacheBackend::Valkey,
        };

        let cache = ValkeySettings {
            host: get("CACHE_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&get, "CACHE_PORT", 6379)?,
            password: get("CACHE_PASSWORD").filter(|p| !p.is_empty()),
            database: parse_or(&get, "CACHE_DB", 0)?,
        };

        let token_ttl_seconds: u64 = parse_or(&get, "TOKEN_CACHE_TTL_SECONDS", 600)?;
        if token_ttl_seconds == 0 {
            return Err(ConfigError::Invalid("TOKEN_CACHE_TTL_SECONDS"));
        }

        let gate = GatePolicy {
            token_ttl: Duration::from_secs(token_ttl_seconds),
            cache_timeout: Duration::from_millis(parse_or(&get, "CACHE_TIMEOUT_MS", 500)?),
            on_authority_failure,
        };

        let request_timeout = Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECONDS", 30)?);

        Ok(Self {
            addr,
            app_env,
            auth_url,
            auth_connect_timeout,
            auth_request_timeout,
            cache_backend,
            cache,
            gate,
            request_timeout,
        })
    }
}

// Unset => default; set but unparsable => Invalid (a typo should not be silently ignored).
fn parse_or<F, T>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}
