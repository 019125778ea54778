use secrecy::Secret;
use service_core::config::{self as core_config, env_or, is_production, parse_env};
use service_core::error::AppError;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    pub common: core_config::Config,
    pub store: StoreConfig,
    pub geo: GeoConfig,
    pub rate_limit: RateLimitConfig,
}

/// Which document store holds user records.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Firebase(FirebaseConfig),
    Mongodb(MongoConfig),
    Memory,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// e.g. `https://my-project-default-rtdb.firebaseio.com`
    pub database_url: String,
    /// Database secret or ID token, sent as the `auth` query parameter.
    pub auth_token: Option<Secret<String>>,
    pub collection: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Clone)]
pub struct GeoConfig {
    /// When false a fixed-location mock provider is used.
    pub enabled: bool,
    pub api_base_url: String,
    pub api_key: Secret<String>,
    pub country_code: String,
    pub timeout: Duration,
    /// Upper bound on time spent retrying transient lookup failures.
    pub retry_max_elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firebase,
    Mongodb,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firebase" => Ok(StoreBackend::Firebase),
            "mongodb" | "mongo" => Ok(StoreBackend::Mongodb),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

impl UserServiceConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        let is_prod = is_production();

        let backend: StoreBackend = env_or("STORE_BACKEND", Some("firebase"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let collection = env_or("USERS_COLLECTION", Some("users"), is_prod)?;

        let store = match backend {
            StoreBackend::Firebase => StoreConfig::Firebase(FirebaseConfig {
                database_url: env_or("FIREBASE_DATABASE_URL", None, is_prod)?,
                auth_token: std::env::var("FIREBASE_AUTH_TOKEN")
                    .ok()
                    .filter(|t| !t.is_empty())
                    .map(Secret::new),
                collection,
                timeout: Duration::from_secs(parse_env(
                    "FIREBASE_TIMEOUT_SECS",
                    &env_or("FIREBASE_TIMEOUT_SECS", Some("10"), is_prod)?,
                )?),
            }),
            StoreBackend::Mongodb => StoreConfig::Mongodb(MongoConfig {
                uri: env_or("MONGODB_URI", None, is_prod)?,
                database: env_or("MONGODB_DATABASE", Some("user_db"), is_prod)?,
                collection,
            }),
            StoreBackend::Memory => {
                if is_prod {
                    return Err(AppError::ConfigError(anyhow::anyhow!(
                        "The memory store cannot be used in production"
                    )));
                }
                StoreConfig::Memory
            }
        };

        let geo_enabled: bool = parse_env(
            "GEO_ENABLED",
            &std::env::var("GEO_ENABLED").unwrap_or_else(|_| "true".to_string()),
        )?;
        let api_key = if geo_enabled {
            env_or("GEO_API_KEY", None, is_prod)?
        } else {
            String::new()
        };

        let geo = GeoConfig {
            enabled: geo_enabled,
            api_base_url: env_or(
                "GEO_API_BASE_URL",
                Some("https://api.openweathermap.org/data/2.5"),
                is_prod,
            )?,
            api_key: Secret::new(api_key),
            country_code: env_or("GEO_COUNTRY_CODE", Some("us"), is_prod)?,
            timeout: Duration::from_secs(parse_env(
                "GEO_TIMEOUT_SECS",
                &env_or("GEO_TIMEOUT_SECS", Some("10"), is_prod)?,
            )?),
            retry_max_elapsed: Duration::from_millis(parse_env(
                "GEO_RETRY_MAX_ELAPSED_MS",
                &env_or("GEO_RETRY_MAX_ELAPSED_MS", Some("5000"), is_prod)?,
            )?),
        };

        // Rate limiting is opt-in and has sane defaults even in production.
        let rate_limit = RateLimitConfig {
            enabled: parse_env(
                "RATE_LIMIT_ENABLED",
                &std::env::var("RATE_LIMIT_ENABLED").unwrap_or_else(|_| "false".to_string()),
            )?,
            requests: parse_env(
                "RATE_LIMIT_REQUESTS",
                &std::env::var("RATE_LIMIT_REQUESTS").unwrap_or_else(|_| "100".to_string()),
            )?,
            window_seconds: parse_env(
                "RATE_LIMIT_WINDOW_SECONDS",
                &std::env::var("RATE_LIMIT_WINDOW_SECONDS").unwrap_or_else(|_| "60".to_string()),
            )?,
        };

        Ok(UserServiceConfig {
            common: common_config,
            store,
            geo,
            rate_limit,
        })
    }
}
