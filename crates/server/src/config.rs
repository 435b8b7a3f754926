//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TUNTAS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `TUNTAS_HOST` - Bind address (default: 127.0.0.1)
//! - `TUNTAS_PORT` - Listen port (default: 5000)
//! - `TUNTAS_CORS_ORIGIN` - Allowed browser origin (default: any)
//! - `TUNTAS_LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `TUNTAS_AVERAGE_SPEED_KMH` - Speed used for ETAs (default: 30)
//! - `TUNTAS_ARRIVAL_RADIUS_M` - "Worker nearby" radius in metres (default: 100)
//! - `TUNTAS_EVENT_CAPACITY` - Notification buffer per subscriber (default: 256)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate, 0.0-1.0 (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use tuntas_kilat_core::{AVERAGE_URBAN_SPEED_KMH, DEFAULT_ARRIVAL_RADIUS_KM};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origin; `None` allows any origin
    pub cors_origin: Option<String>,
    /// Log output format
    pub log_format: LogFormat,
    /// Tracking/ETA tuning
    pub tracking: TrackingConfig,
    /// Notification buffer size
    pub event_capacity: usize,
    /// Sentry settings
    pub sentry: SentryConfig,
}

/// Tunables for distance and ETA estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingConfig {
    /// Assumed average travel speed in km/h.
    pub average_speed_kmh: f64,
    /// Radius around the customer that counts as "nearby", in km.
    pub arrival_radius_km: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            average_speed_kmh: AVERAGE_URBAN_SPEED_KMH,
            arrival_radius_km: DEFAULT_ARRIVAL_RADIUS_KM,
        }
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origin", &self.cors_origin)
            .field("log_format", &self.log_format)
            .field("tracking", &self.tracking)
            .field("event_capacity", &self.event_capacity)
            .field("sentry", &self.sentry)
            .finish()
    }
}

impl ServerConfig {
    /// Default capacity of the notification channel.
    pub const DEFAULT_EVENT_CAPACITY: usize = 256;

    /// Largest accepted notification channel capacity.
    pub const MAX_EVENT_CAPACITY: usize = 65_536;

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

        let database_url = get_database_url("TUNTAS_DATABASE_URL")?;
        let host = get_parsed_or_default::<IpAddr>("TUNTAS_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("TUNTAS_PORT", "5000")?;
        let cors_origin = get_optional_env("TUNTAS_CORS_ORIGIN");
        let log_format = match get_optional_env("TUNTAS_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let average_speed_kmh = get_parsed_or_default::<f64>(
            "TUNTAS_AVERAGE_SPEED_KMH",
            &AVERAGE_URBAN_SPEED_KMH.to_string(),
        )?;
        let arrival_radius_m = get_parsed_or_default::<f64>("TUNTAS_ARRIVAL_RADIUS_M", "100")?;
        let tracking = TrackingConfig {
            average_speed_kmh: require_positive("TUNTAS_AVERAGE_SPEED_KMH", average_speed_kmh)?,
            arrival_radius_km: require_positive("TUNTAS_ARRIVAL_RADIUS_M", arrival_radius_m)?
                / 1000.0,
        };

        let event_capacity = get_parsed_or_default::<usize>(
            "TUNTAS_EVENT_CAPACITY",
            &Self::DEFAULT_EVENT_CAPACITY.to_string(),
        )?;
        let event_capacity = require_event_capacity("TUNTAS_EVENT_CAPACITY", event_capacity)?;

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: get_parsed_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: get_parsed_or_default::<f32>("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            cors_origin,
            log_format,
            tracking,
            event_capacity,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configuration for tests and tooling: local defaults, no Sentry.
    #[must_use]
    pub fn local(database_url: &str) -> Self {
        Self {
            database_url: SecretString::from(database_url.to_owned()),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5000,
            cors_origin: None,
            log_format: LogFormat::Text,
            tracking: TrackingConfig::default(),
            event_capacity: Self::DEFAULT_EVENT_CAPACITY,
            sentry: SentryConfig::default(),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional, non-empty environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn require_positive(key: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be a positive number (got {value})"),
        ))
    }
}

fn require_event_capacity(key: &str, value: usize) -> Result<usize, ConfigError> {
    if (1..=ServerConfig::MAX_EVENT_CAPACITY).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!(
                "must be between 1 and {} (got {value})",
                ServerConfig::MAX_EVENT_CAPACITY
            ),
        ))
    }
}
