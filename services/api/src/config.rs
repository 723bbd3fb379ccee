//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use courseware_core::retry::RetryPolicy;
use courseware_core::Pacing;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where the project list is stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite(String),
    /// Nothing survives a restart. Selected with `DATABASE_URL=memory`.
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub storage: StorageBackend,
    pub log_level: Level,
    pub cors_origin: String,
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub pacing: Pacing,
    pub retry: RetryPolicy,
    pub rename_debounce: Duration,
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
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        // --- Load Server and Storage Settings ---
        let bind_address = parse_var::<SocketAddr>("BIND_ADDRESS", &var_or("BIND_ADDRESS", "0.0.0.0:3000"))?;

        let storage = match var_or("DATABASE_URL", "sqlite://courseware.db?mode=rwc").as_str() {
            "memory" => StorageBackend::Memory,
            url if url.starts_with("sqlite:") => StorageBackend::Sqlite(url.to_string()),
            other => {
                return Err(ConfigError::InvalidValue(
                    "DATABASE_URL".to_string(),
                    format!("'{}' is neither a sqlite: URL nor 'memory'", other),
                ))
            }
        };

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = var_or("CORS_ORIGIN", "http://localhost:5173");

        // --- Load Model Settings ---
        let gemini_api_key = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty());
        let gemini_base_url = var_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL);
        let text_model = var_or("TEXT_MODEL", "gemini-3-flash-preview");
        let image_model = var_or("IMAGE_MODEL", "imagen-3.0-generate-002");

        // --- Load Orchestration Timing ---
        let pacing = Pacing {
            batch_delay: millis_var(&lookup, "BATCH_DELAY_MS", 1200)?,
            module_delay: millis_var(&lookup, "MODULE_DELAY_MS", 800)?,
        };
        let retry = RetryPolicy {
            max_retries: parse_var::<u32>("MAX_RETRIES", &var_or("MAX_RETRIES", "3"))?,
            base_delay: millis_var(&lookup, "RETRY_BASE_DELAY_MS", 1500)?,
        };
        let rename_debounce = millis_var(&lookup, "RENAME_DEBOUNCE_MS", 500)?;

        Ok(Self {
            bind_address,
            storage,
            log_level,
            cors_origin,
            gemini_api_key,
            gemini_base_url,
            text_model,
            image_model,
            pacing,
            retry,
            rename_debounce,
        })
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

fn millis_var<F>(lookup: &F, name: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => parse_var::<u64>(name, &raw).map(Duration::from_millis),
        None => Ok(Duration::from_millis(default)),
    }
}
