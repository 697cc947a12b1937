//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;

use axum::http::{header, HeaderMap, HeaderValue};
use thiserror::Error;

/// Default prefix stripped from request paths before routing.
pub const DEFAULT_API_PREFIX: &str = "/api/";

/// Configuration errors that abort startup.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

/// Connection settings for the managed backend.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://project.supabase.co`
    pub url: String,
    /// API key sent with every backend request
    pub api_key: String,
    /// Timeout in seconds for outbound requests
    pub timeout_secs: u64,
}

/// The fixed CORS header set attached to every response.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub allow_origin: HeaderValue,
    pub allow_headers: HeaderValue,
    pub allow_methods: HeaderValue,
}

impl CorsPolicy {
    /// Writes the CORS headers into `headers`, replacing existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
            allow_headers: HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
            allow_methods: HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
        }
    }
}

/// Gateway configuration parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Prefix stripped before route lookup
    pub api_prefix: String,
    pub backend: BackendConfig,
    pub cors: CorsPolicy,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `SUPABASE_URL` - Backend base URL (required)
    /// - `SUPABASE_ANON_KEY` - Backend API key (required)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `API_PREFIX` - Path prefix stripped before routing (default: `/api/`)
    /// - `CORS_ALLOW_ORIGIN` - Allowed origin (default: `*`)
    /// - `BACKEND_TIMEOUT_SECS` - Outbound request timeout (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let url = required("SUPABASE_URL")?;
        let api_key = required("SUPABASE_ANON_KEY")?;

        let mut cors = CorsPolicy::default();
        if let Some(origin) = lookup("CORS_ALLOW_ORIGIN") {
            cors.allow_origin = HeaderValue::from_str(&origin)
                .map_err(|_| ConfigError::Invalid("CORS_ALLOW_ORIGIN", origin.clone()))?;
        }

        let defaults = Self::default();
        Ok(Self {
            server_port: lookup("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            api_prefix: lookup("API_PREFIX").unwrap_or(defaults.api_prefix),
            backend: BackendConfig {
                url,
                api_key,
                timeout_secs: lookup("BACKEND_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.backend.timeout_secs),
            },
            cors,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            backend: BackendConfig {
                url: String::new(),
                api_key: String::new(),
                timeout_secs: 10,
            },
            cors: CorsPolicy::default(),
        }
    }
}
