//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which persistence adapter backs the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store: StoreBackend,
    pub log_level: Level,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub signed_url_ttl_secs: i64,
    pub session_ttl_days: i64,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(name.to_string(), format!("'{}' could not be parsed", raw))
    })
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Persistence ---
        let backend = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "postgres".to_string());
        let store = match backend.to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORE_BACKEND".to_string(),
                    format!("'{}' is not one of postgres, memory", other),
                ))
            }
        };

        // --- File Storage ---
        let storage_root = std::env::var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./storage"));
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let signed_url_ttl_secs = parse_var::<i64>("SIGNED_URL_TTL_SECS", "3600")?;
        let max_upload_bytes = parse_var::<usize>("MAX_UPLOAD_BYTES", "20971520")?;

        // --- Web ---
        let session_ttl_days = parse_var::<i64>("SESSION_TTL_DAYS", "30")?;
        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:5173".to_string());

        if signed_url_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "SIGNED_URL_TTL_SECS".to_string(),
                "must be positive".to_string(),
            ));
        }
        if session_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "SESSION_TTL_DAYS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            store,
            log_level,
            storage_root,
            public_base_url,
            signed_url_ttl_secs,
            session_ttl_days,
            cors_origin,
            max_upload_bytes,
        })
    }

    /// A configuration suitable for tests: in-memory store, storage under `storage_root`.
    #[cfg(test)]
    pub fn for_tests(storage_root: PathBuf) -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            store: StoreBackend::Memory,
            log_level: Level::DEBUG,
            storage_root,
            public_base_url: "http://localhost:3000".to_string(),
            signed_url_ttl_secs: 3600,
            session_ttl_days: 30,
            cors_origin: "http://localhost:5173".to_string(),
            max_upload_bytes: 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-wide; serialize the tests touching them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 9] = [
        "BIND_ADDRESS",
        "STORE_BACKEND",
        "DATABASE_URL",
        "RUST_LOG",
        "STORAGE_ROOT",
        "PUBLIC_BASE_URL",
        "SIGNED_URL_TTL_SECS",
        "SESSION_TTL_DAYS",
        "MAX_UPLOAD_BYTES",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn postgres_backend_needs_a_database_url() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        assert!(matches!(Config::from_env(), Err(ConfigError::MissingVar(v)) if v == "DATABASE_URL"));

        std::env::set_var("DATABASE_URL", "postgres://localhost/market");
        let config = Config::from_env().unwrap();
        assert_eq!(
            config.store,
            StoreBackend::Postgres {
                database_url: "postgres://localhost/market".to_string()
            }
        );
        assert_eq!(config.signed_url_ttl_secs, 3600);
        assert_eq!(config.session_ttl_days, 30);
        clear_env();
    }

    #[test]
    fn memory_backend_and_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("STORE_BACKEND", "memory");
        std::env::set_var("PUBLIC_BASE_URL", "https://notes.example.com/");
        std::env::set_var("SIGNED_URL_TTL_SECS", "60");

        let config = Config::from_env().unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.public_base_url, "https://notes.example.com");
        assert_eq!(config.signed_url_ttl_secs, 60);
        clear_env();
    }

    #[test]
    fn invalid_values_are_reported() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("STORE_BACKEND", "memory");
        std::env::set_var("SIGNED_URL_TTL_SECS", "soon");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(v, _)) if v == "SIGNED_URL_TTL_SECS"
        ));

        std::env::set_var("SIGNED_URL_TTL_SECS", "60");
        std::env::set_var("STORE_BACKEND", "mongo");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidValue(v, _)) if v == "STORE_BACKEND"
        ));
        clear_env();
    }
}
