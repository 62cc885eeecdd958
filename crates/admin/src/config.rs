//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (backend mode)
//! - `EASYHOME_API_URL` - Base URL of the EasyHome backend API
//!
//! ## Optional
//! - `EASYHOME_ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `EASYHOME_ADMIN_PORT` - Listen port (default: 3001)
//! - `EASYHOME_ADMIN_BASE_URL` - Public URL of the console (default: <http://localhost:3001>)
//! - `EASYHOME_AUTH_MODE` - `backend` or `fixture` (default: backend)
//! - `EASYHOME_API_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Sentry traces sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_TIMEOUT_SECS: u64 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which authenticator the console uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// The EasyHome backend API.
    #[default]
    Backend,
    /// Built-in fixture accounts, for local development.
    Fixture,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backend" => Ok(Self::Backend),
            "fixture" => Ok(Self::Fixture),
            other => Err(format!("expected 'backend' or 'fixture', got '{other}'")),
        }
    }
}

/// Connection settings for the EasyHome backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend API
    pub api_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the console
    pub base_url: String,
    /// Authenticator selection
    pub auth_mode: AuthMode,
    /// Backend settings; `None` in fixture mode
    pub backend: Option<BackendConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("EASYHOME_ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| invalid("EASYHOME_ADMIN_HOST", e))?;
        let port = get_env_or_default("EASYHOME_ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| invalid("EASYHOME_ADMIN_PORT", e))?;
        let base_url = get_env_or_default("EASYHOME_ADMIN_BASE_URL", "http://localhost:3001");
        let auth_mode = get_optional_env("EASYHOME_AUTH_MODE")
            .map(|s| s.parse::<AuthMode>())
            .transpose()
            .map_err(|e| invalid("EASYHOME_AUTH_MODE", e))?
            .unwrap_or_default();
        let backend = match auth_mode {
            AuthMode::Backend => Some(BackendConfig::from_env()?),
            AuthMode::Fixture => None,
        };
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            auth_mode,
            backend,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Configuration for tests and local tooling: fixture accounts, no Sentry.
    #[must_use]
    pub fn fixture() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            auth_mode: AuthMode::Fixture,
            backend: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the console is served over HTTPS (enables secure cookies).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("EASYHOME_API_URL")?;
        let api_url = Url::parse(&raw).map_err(|e| invalid("EASYHOME_API_URL", e))?;
        let timeout = get_optional_env("EASYHOME_API_TIMEOUT_SECS")
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|e| invalid("EASYHOME_API_TIMEOUT_SECS", e))?
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(timeout),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn invalid(key: &str, e: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), e.to_string())
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}
