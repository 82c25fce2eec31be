// Process configuration read from the environment (and .env when present)

use std::time::Duration;
use thiserror::Error;

use crate::auth::middleware::DEFAULT_ROLE_LOOKUP_TIMEOUT;
use crate::auth::token::{DEFAULT_ACCESS_TOKEN_TTL_SECS, DEFAULT_REFRESH_TOKEN_TTL_SECS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("SECRET_KEY and REFRESH_TOKEN must be different secrets")]
    SharedSecret,
}

/// Runtime configuration
///
/// | Variable | Default |
/// |---|---|
/// | `DATABASE_URL` | required |
/// | `HOST` | `0.0.0.0` |
/// | `PORT` | `8080` |
/// | `SECRET_KEY` | required (access-token secret) |
/// | `REFRESH_TOKEN` | required (refresh-token secret) |
/// | `ACCESS_TOKEN_TTL_SECS` | `300` |
/// | `REFRESH_TOKEN_TTL_SECS` | `604800` |
/// | `ROLE_LOOKUP_TIMEOUT_MS` | `3000` |
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub role_lookup_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("role_lookup_timeout", &self.role_lookup_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let database_url = required("DATABASE_URL")?;
        let access_secret = required("SECRET_KEY")?;
        let refresh_secret = required("REFRESH_TOKEN")?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let access_token_ttl_secs =
            parse_positive(&lookup, "ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?;
        let refresh_token_ttl_secs =
            parse_positive(&lookup, "REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TOKEN_TTL_SECS)?;
        let timeout_ms = parse_positive(
            &lookup,
            "ROLE_LOOKUP_TIMEOUT_MS",
            DEFAULT_ROLE_LOOKUP_TIMEOUT.as_millis() as i64,
        )?;

        Ok(Self {
            database_url,
            host,
            port,
            access_secret,
            refresh_secret,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            role_lookup_timeout: Duration::from_millis(timeout_ms as u64),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn parse_positive<F>(lookup: &F, name: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, name, default)?;
    if value <= 0 {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgres://localhost/assets"),
        ("SECRET_KEY", "access-secret"),
        ("REFRESH_TOKEN", "refresh-secret"),
    ];

    #[test]
    fn test_defaults_apply() {
        let config = Config::from_lookup(env(&BASE)).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.access_token_ttl_secs, 300);
        assert_eq!(config.refresh_token_ttl_secs, 604_800);
        assert_eq!(config.role_lookup_timeout, Duration::from_millis(3000));
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let vars = env(&BASE[..2]);
        assert_eq!(
            Config::from_lookup(vars).unwrap_err(),
            ConfigError::Missing("REFRESH_TOKEN")
        );
    }

    #[test]
    fn test_secrets_must_differ() {
        let vars = env(&[
            ("DATABASE_URL", "postgres://localhost/assets"),
            ("SECRET_KEY", "same"),
            ("REFRESH_TOKEN", "same"),
        ]);
        assert_eq!(Config::from_lookup(vars).unwrap_err(), ConfigError::SharedSecret);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("PORT", "9090"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("ROLE_LOOKUP_TIMEOUT_MS", "250"),
        ]);
        let config = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.access_token_ttl_secs, 60);
        assert_eq!(config.role_lookup_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("ACCESS_TOKEN_TTL_SECS", "-5"));
        assert!(matches!(
            Config::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid { name: "ACCESS_TOKEN_TTL_SECS", .. })
        ));

        let mut pairs = BASE.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            Config::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }
}
