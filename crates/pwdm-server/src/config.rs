//! Server configuration for pwdm.
//!
//! Settings are resolved in three layers: built-in defaults, then an optional
//! JSON config file, then `PWDM_*` environment variables (highest priority).
//!
//! Environment variables:
//! - `PWDM_CONFIG_FILE`: JSON file to read (default: `config.json`, skipped if absent)
//! - `PWDM_BIND_ADDR`: listen address (default: `127.0.0.1:3200`)
//! - `PWDM_STORAGE`: `postgres` or `memory` (default: `postgres`)
//! - `DATABASE_URL`: PostgreSQL connection string (required for `postgres`)
//! - `PWDM_TOKEN_TTL_SECS`: bearer token lifetime (default: `3600`)
//! - `PWDM_MAX_CONNECTIONS`: database pool size (default: `10`)
//! - `PWDM_LOG_LEVEL`: log filter (default: `info`)

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "config.json";
const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::V4(std::net::SocketAddrV4::new(
    std::net::Ipv4Addr::LOCALHOST,
    3200,
));
const DEFAULT_TOKEN_TTL_SECS: i64 = pwdm_core::DEFAULT_TTL_SECS;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
/// Longest accepted token lifetime: 30 days.
const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {reason}")]
    ReadFile { path: PathBuf, reason: String },

    /// The config file is not valid JSON for [`FileConfig`].
    #[error("failed to parse config file {path}: {reason}")]
    ParseFile { path: PathBuf, reason: String },

    /// A setting has a value that cannot be used.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    /// PostgreSQL storage was selected without a connection string.
    #[error("DATABASE_URL is required when storage is postgres")]
    MissingDatabaseUrl,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Lifetime of issued bearer tokens, in seconds.
    pub token_ttl_secs: i64,
    /// Maximum size of the database connection pool.
    pub max_connections: u32,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
}

/// Supported storage backend types.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// PostgreSQL persistent storage.
    Postgres { url: String },
}

impl fmt::Debug for StorageBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("url", &"[redacted]")
                .finish(),
        }
    }
}

/// Shape of the optional JSON config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub bind_addr: Option<String>,
    pub storage: Option<String>,
    pub database_url: Option<String>,
    pub token_ttl_secs: Option<i64>,
    pub max_connections: Option<u32>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadFile`] or [`ConfigError::ParseFile`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseFile {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }
}

impl ServerConfig {
    /// Load configuration from the process environment and config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_sources(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is unreadable or a value is invalid.
    pub fn from_sources(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let file = match lookup("PWDM_CONFIG_FILE") {
            Some(path) => FileConfig::load(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                FileConfig::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => FileConfig::default(),
        };

        Self::merge(file, lookup)
    }

    fn merge(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = match lookup("PWDM_BIND_ADDR").or(file.bind_addr) {
            Some(addr) => addr.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValue {
                key: "bind_addr",
                reason: format!("{e}"),
            })?,
            None => DEFAULT_BIND_ADDR,
        };

        let storage = lookup("PWDM_STORAGE")
            .or(file.storage)
            .unwrap_or_else(|| "postgres".to_owned());
        let storage_backend = match storage.to_lowercase().as_str() {
            "memory" => StorageBackendType::Memory,
            "postgres" | "postgresql" => {
                let url = lookup("DATABASE_URL")
                    .or(file.database_url)
                    .filter(|url| !url.is_empty())
                    .ok_or(ConfigError::MissingDatabaseUrl)?;
                StorageBackendType::Postgres { url }
            }
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "storage",
                    reason: format!("unknown backend '{other}', expected postgres or memory"),
                });
            }
        };

        let token_ttl_secs = match lookup("PWDM_TOKEN_TTL_SECS") {
            Some(raw) => parse_number("token_ttl_secs", &raw)?,
            None => file.token_ttl_secs.unwrap_or(DEFAULT_TOKEN_TTL_SECS),
        };
        if token_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "token_ttl_secs",
                reason: "must be positive".to_owned(),
            });
        }
        if token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "token_ttl_secs",
                reason: format!("must be at most {MAX_TOKEN_TTL_SECS}"),
            });
        }

        let max_connections = match lookup("PWDM_MAX_CONNECTIONS") {
            Some(raw) => parse_number("max_connections", &raw)?,
            None => file.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
        };
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_connections",
                reason: "must be at least 1".to_owned(),
            });
        }

        let log_level = lookup("PWDM_LOG_LEVEL")
            .or(file.log_level)
            .unwrap_or_else(|| "info".to_owned());

        Ok(Self {
            bind_addr,
            storage_backend,
            token_ttl_secs,
            max_connections,
            log_level,
        })
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ServerConfig::merge(FileConfig::default(), env(&[("PWDM_STORAGE", "memory")]))
            .unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.storage_backend, StorageBackendType::Memory);
        assert_eq!(config.token_ttl_secs, 3600);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn postgres_requires_database_url() {
        let result = ServerConfig::merge(FileConfig::default(), env(&[]));
        assert!(matches!(result, Err(ConfigError::MissingDatabaseUrl)));
    }

    #[test]
    fn file_values_are_used() {
        let file = write_config(
            r#"{"bind_addr": "0.0.0.0:4000", "database_url": "postgres://db/pwdm", "token_ttl_secs": 60}"#,
        );
        let path = file.path().to_str().unwrap().to_owned();

        let config = ServerConfig::from_sources(env(&[("PWDM_CONFIG_FILE", path.as_str())])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:4000".parse().unwrap());
        assert_eq!(
            config.storage_backend,
            StorageBackendType::Postgres {
                url: "postgres://db/pwdm".to_owned()
            }
        );
        assert_eq!(config.token_ttl_secs, 60);
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_config(r#"{"storage": "postgres", "log_level": "warn", "max_connections": 3}"#);
        let path = file.path().to_str().unwrap().to_owned();

        let config = ServerConfig::from_sources(env(&[
            ("PWDM_CONFIG_FILE", path.as_str()),
            ("PWDM_STORAGE", "memory"),
            ("PWDM_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.storage_backend, StorageBackendType::Memory);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_connections, 3);
    }

    #[test]
    fn token_ttl_is_capped_at_thirty_days() {
        for raw in ["2592001", "10000000000000", "9223372036854776"] {
            let result = ServerConfig::merge(
                FileConfig::default(),
                env(&[("PWDM_STORAGE", "memory"), ("PWDM_TOKEN_TTL_SECS", raw)]),
            );
            assert!(
                matches!(result, Err(ConfigError::InvalidValue { key: "token_ttl_secs", .. })),
                "{raw}"
            );
        }

        let longest = ServerConfig::merge(
            FileConfig::default(),
            env(&[("PWDM_STORAGE", "memory"), ("PWDM_TOKEN_TTL_SECS", "2592000")]),
        )
        .unwrap();
        assert_eq!(longest.token_ttl_secs, MAX_TOKEN_TTL_SECS);
        assert!(chrono::Duration::try_seconds(longest.token_ttl_secs).is_some());
    }

    #[test]
    fn missing_named_config_file_is_an_error() {
        let result = ServerConfig::from_sources(env(&[
            ("PWDM_CONFIG_FILE", "/nonexistent/pwdm.json"),
            ("PWDM_STORAGE", "memory"),
        ]));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let file = write_config(r#"{"bind_adr": "0.0.0.0:1"}"#);
        assert!(matches!(
            FileConfig::load(file.path()),
            Err(ConfigError::ParseFile { .. })
        ));
    }

    #[test]
    fn invalid_values_are_reported_by_key() {
        let bad_ttl = ServerConfig::merge(
            FileConfig::default(),
            env(&[("PWDM_STORAGE", "memory"), ("PWDM_TOKEN_TTL_SECS", "0")]),
        );
        assert!(matches!(
            bad_ttl,
            Err(ConfigError::InvalidValue { key: "token_ttl_secs", .. })
        ));

        let bad_backend = ServerConfig::merge(FileConfig::default(), env(&[("PWDM_STORAGE", "redis")]));
        assert!(matches!(
            bad_backend,
            Err(ConfigError::InvalidValue { key: "storage", .. })
        ));

        let bad_addr = ServerConfig::merge(
            FileConfig::default(),
            env(&[("PWDM_STORAGE", "memory"), ("PWDM_BIND_ADDR", "nowhere")]),
        );
        assert!(matches!(
            bad_addr,
            Err(ConfigError::InvalidValue { key: "bind_addr", .. })
        ));
    }

    #[test]
    fn debug_output_hides_database_url() {
        let backend = StorageBackendType::Postgres {
            url: "postgres://user:hunter2@db/pwdm".to_owned(),
        };
        assert!(!format!("{backend:?}").contains("hunter2"));
    }
}
