use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

/// Settings shared by every service: listener port and telemetry.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP collector endpoint. Spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// True when `ENVIRONMENT=prod`.
pub fn is_production() -> bool {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod"
}

/// Read `key` from the environment.
///
/// In production every key is mandatory. Outside production the `default` is
/// used when the variable is unset, and a missing key without default is an
/// error.
pub fn env_or(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Parse an environment value, naming the key in the error.
pub fn parse_env<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_applies_outside_production() {
        let value = env_or("SERVICE_CORE_TEST_UNSET_KEY", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn missing_key_without_default_is_an_error() {
        let err = env_or("SERVICE_CORE_TEST_UNSET_KEY", None, false).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn production_ignores_defaults() {
        let err = env_or("SERVICE_CORE_TEST_UNSET_KEY", Some("fallback"), true).unwrap_err();
        assert!(err.to_string().contains("required in production"));
    }

    #[test]
    fn parse_env_reports_the_key() {
        let ok: u64 = parse_env("GEO_TIMEOUT_SECS", " 15 ").unwrap();
        assert_eq!(ok, 15);

        let err = parse_env::<u64>("GEO_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("GEO_TIMEOUT_SECS"));
    }
}
