//! Configuration management for the file exchange server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Default listening port, shared with the workers' configuration
pub const DEFAULT_PORT: u16 = 9999;

/// Default request body limit: 256MB
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body (POST and PUT)
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Shared storage root; a temporary directory is used when unset
    pub root: Option<PathBuf>,
    /// Directory tree to preload into the task store
    pub tasks_source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
            storage: StorageConfig {
                root: None,
                tasks_source: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: lookup("FILE_SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var(&lookup, "FILE_SERVER_PORT", defaults.server.port)?,
                max_body_bytes: parse_var(
                    &lookup,
                    "FILE_SERVER_MAX_BODY_BYTES",
                    defaults.server.max_body_bytes,
                )?,
            },
            storage: StorageConfig {
                root: lookup("FILE_SERVER_ROOT")
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from),
                tasks_source: lookup("FILE_SERVER_TASKS")
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from),
            },
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(config.storage.root.is_none());
        assert!(config.storage.tasks_source.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("FILE_SERVER_HOST", "127.0.0.1"),
            ("FILE_SERVER_PORT", "8080"),
            ("FILE_SERVER_ROOT", "/srv/exchange"),
            ("FILE_SERVER_TASKS", "/srv/tasks"),
            ("FILE_SERVER_MAX_BODY_BYTES", "1024"),
        ]))
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_body_bytes, 1024);
        assert_eq!(config.storage.root, Some(PathBuf::from("/srv/exchange")));
        assert_eq!(config.storage.tasks_source, Some(PathBuf::from("/srv/tasks")));
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup_from(&[("FILE_SERVER_PORT", "http")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "FILE_SERVER_PORT",
                value: "http".to_string()
            }
        );
    }
}
