//! Process configuration, read from the environment.

use std::net::SocketAddr;

use thiserror::Error;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidAddr { var: &'static str, value: String },

    #[error("{var} must be a positive integer, got {value}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{0} is set but empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (tests use a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidAddr {
                var: "BIND_ADDR",
                value: raw_addr.clone(),
            })?;

        let database = match lookup("DATABASE_URL") {
            None => None,
            Some(url) if url.trim().is_empty() => return Err(ConfigError::Empty("DATABASE_URL")),
            Some(url) => Some(DatabaseConfig {
                url: url.trim().to_string(),
                max_connections: max_connections(lookup("DATABASE_MAX_CONNECTIONS"))?,
            }),
        };

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            Some(_) => return Err(ConfigError::Empty("JWT_SECRET")),
            None => {
                warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        Ok(Self {
            bind_addr,
            database,
            jwt_secret,
        })
    }
}

fn max_connections(raw: Option<String>) -> Result<u32, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_MAX_CONNECTIONS);
    };
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var: "DATABASE_MAX_CONNECTIONS",
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_dev_setup() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(cfg.database, None);
        assert_eq!(cfg.jwt_secret, "dev-secret");
    }

    #[test]
    fn database_settings_are_parsed() {
        let cfg = config(&[
            ("DATABASE_URL", "postgres://localhost/tutorhub"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("JWT_SECRET", "s3cret"),
        ])
        .unwrap();
        let db = cfg.database.unwrap();
        assert_eq!(db.url, "postgres://localhost/tutorhub");
        assert_eq!(db.max_connections, 12);
        assert_eq!(cfg.jwt_secret, "s3cret");
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            config(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddr { .. })
        ));
        assert!(matches!(
            config(&[("DATABASE_URL", "postgres://x"), ("DATABASE_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert_eq!(config(&[("JWT_SECRET", "")]), Err(ConfigError::Empty("JWT_SECRET")));
    }
}
