//! Configuration module for the invitation service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Placeholder admin secret used when `DOTTECH_ADMIN_PASSWORD` is unset.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
/// Placeholder super-admin secret used when `DOTTECH_SUPER_ADMIN_PASSWORD` is unset.
pub const DEFAULT_SUPER_ADMIN_PASSWORD: &str = "su_root-p";

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid DOTTECH_BIND_ADDR {value:?}: {source}")]
    BindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid DOTTECH_STORE_TIMEOUT_SECS {value:?}: {source}")]
    StoreTimeout {
        value: String,
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Path to the SQLite file backing the local cache
    pub cache_path: PathBuf,
    /// Base URL of the remote document store; `None` selects the in-process store
    pub store_url: Option<String>,
    /// Optional auth token appended to remote store requests
    pub store_auth: Option<String>,
    /// Per-request timeout for remote store calls
    pub store_timeout: Duration,
    /// Shared secret for the standard admin tier
    pub admin_password: String,
    /// Shared secret for the super admin tier
    pub super_admin_password: String,
    /// Origin used when building invitation links (e.g. `https://dottech.example`)
    pub public_origin: String,
    /// Path of the landing page on `public_origin`
    pub public_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind_raw =
            env::var("DOTTECH_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_raw
            .parse()
            .map_err(|source| ConfigError::BindAddr {
                value: bind_raw.clone(),
                source,
            })?;

        let log_level = env::var("DOTTECH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let cache_path = env::var("DOTTECH_CACHE_PATH")
            .unwrap_or_else(|_| "./data/cache.sqlite".to_string())
            .into();

        let store_url = non_empty_var("DOTTECH_STORE_URL")
            .map(|url| url.trim_end_matches('/').to_string());
        let store_auth = non_empty_var("DOTTECH_STORE_AUTH");

        let timeout_raw = env::var("DOTTECH_STORE_TIMEOUT_SECS").unwrap_or_else(|_| "10".into());
        let store_timeout = timeout_raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|source| ConfigError::StoreTimeout {
                value: timeout_raw.clone(),
                source,
            })?;

        let admin_password = non_empty_var("DOTTECH_ADMIN_PASSWORD")
            .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());
        let super_admin_password = non_empty_var("DOTTECH_SUPER_ADMIN_PASSWORD")
            .unwrap_or_else(|| DEFAULT_SUPER_ADMIN_PASSWORD.to_string());

        let public_origin = env::var("DOTTECH_PUBLIC_ORIGIN")
            .map(|origin| origin.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://{}", bind_addr));
        let public_path = env::var("DOTTECH_PUBLIC_PATH").unwrap_or_else(|_| "/".to_string());

        Ok(Self {
            bind_addr,
            log_level,
            cache_path,
            store_url,
            store_auth,
            store_timeout,
            admin_password,
            super_admin_password,
            public_origin,
            public_path,
        })
    }

    /// True when either admin secret is still the compiled-in placeholder.
    pub fn uses_placeholder_secrets(&self) -> bool {
        self.admin_password == DEFAULT_ADMIN_PASSWORD
            || self.super_admin_password == DEFAULT_SUPER_ADMIN_PASSWORD
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
