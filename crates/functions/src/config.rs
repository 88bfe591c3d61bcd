//! Functions configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STORAGE_CONNECTION_STRING` - Table store backend (`postgres://...` or `memory:`).
//!   Falls back to `AzureWebJobsStorage` when unset.
//! - `FUNCTION_KEY` - Function-level access key (high entropy, not a placeholder)
//!
//! ## Optional
//! - `QUEUE_CONNECTION_STRING` - Queue backend (default: the storage connection string)
//! - `ORDERS_QUEUE_NAME` - Order notification queue (default: ordersqueue)
//! - `QUEUE_BATCH_SIZE` - Messages returned per drain, 1-32 (default: 32)
//! - `QUEUE_VISIBILITY_TIMEOUT_SECS` - How long drained messages stay hidden, 0-604800 (default: 30)
//! - `SCAN_PAGE_SIZE` - Rows per table segment, 1-1000 (default: 1000)
//! - `REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `FUNCTIONS_HOST` - Bind address (default: 127.0.0.1)
//! - `FUNCTIONS_PORT` - Listen port (default: 7071)
//! - `LOG_FORMAT` - `text` or `json` (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::backend::BackendKind;

pub const DEFAULT_QUEUE_NAME: &str = "ordersqueue";
pub const MAX_QUEUE_BATCH_SIZE: u32 = 32;
pub const MAX_SCAN_PAGE_SIZE: u32 = 1000;
/// Seven days, the longest a received message may stay hidden.
pub const MAX_VISIBILITY_TIMEOUT_SECS: u64 = 604_800;

const MIN_FUNCTION_KEY_LENGTH: usize = 24;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Functions application configuration.
///
/// Built once at process start and shared through [`crate::state::AppState`].
#[derive(Clone)]
pub struct FunctionsConfig {
    /// Table store connection string (may contain a password)
    pub storage_connection: SecretString,
    /// Queue connection string (may contain a password)
    pub queue_connection: SecretString,
    /// Name of the order notification queue
    pub queue_name: String,
    /// Maximum messages returned by one drain
    pub queue_batch_size: u32,
    /// How long a drained message stays invisible to other drains
    pub queue_visibility_timeout: Duration,
    /// Rows fetched per table segment
    pub scan_page_size: u32,
    /// Upper bound on handling a single request
    pub request_timeout: Duration,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Function-level access key
    pub function_key: SecretString,
    /// Tracing output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for FunctionsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionsConfig")
            .field("storage_connection", &"[REDACTED]")
            .field("queue_connection", &"[REDACTED]")
            .field("queue_name", &self.queue_name)
            .field("queue_batch_size", &self.queue_batch_size)
            .field("queue_visibility_timeout", &self.queue_visibility_timeout)
            .field("scan_page_size", &self.scan_page_size)
            .field("request_timeout", &self.request_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("function_key", &"[REDACTED]")
            .field("log_format", &self.log_format)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[SET]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl FunctionsConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the function key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`FunctionsConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let storage_connection = env.connection_string(
            "STORAGE_CONNECTION_STRING",
            env.get("STORAGE_CONNECTION_STRING")
                .or_else(|| env.get("AzureWebJobsStorage")),
        )?;
        let queue_connection = match env.get("QUEUE_CONNECTION_STRING") {
            Some(value) => env.connection_string("QUEUE_CONNECTION_STRING", Some(value))?,
            None => storage_connection.clone(),
        };

        let queue_name = env.get_or_default("ORDERS_QUEUE_NAME", DEFAULT_QUEUE_NAME);
        validate_queue_name(&queue_name)?;

        let queue_batch_size =
            env.parse_bounded("QUEUE_BATCH_SIZE", MAX_QUEUE_BATCH_SIZE, 1..=MAX_QUEUE_BATCH_SIZE)?;
        let queue_visibility_timeout = Duration::from_secs(env.parse_bounded(
            "QUEUE_VISIBILITY_TIMEOUT_SECS",
            30,
            0..=MAX_VISIBILITY_TIMEOUT_SECS,
        )?);
        let scan_page_size =
            env.parse_bounded("SCAN_PAGE_SIZE", MAX_SCAN_PAGE_SIZE, 1..=MAX_SCAN_PAGE_SIZE)?;
        let request_timeout_secs: u64 = env.parse_or_default("REQUEST_TIMEOUT_SECS", 30)?;
        if request_timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let host = env.parse_or_default("FUNCTIONS_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = env.parse_or_default("FUNCTIONS_PORT", 7071_u16)?;

        let function_key = env.required("FUNCTION_KEY")?;
        validate_secret_strength(&function_key, "FUNCTION_KEY")?;
        validate_function_key_length(&function_key, "FUNCTION_KEY")?;

        let log_format = match env.get_or_default("LOG_FORMAT", "text").as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "LOG_FORMAT".to_string(),
                    format!("expected `text` or `json`, got `{other}`"),
                ));
            }
        };

        Ok(Self {
            storage_connection,
            queue_connection,
            queue_name,
            queue_batch_size,
            queue_visibility_timeout,
            scan_page_size,
            request_timeout: Duration::from_secs(request_timeout_secs),
            host,
            port,
            function_key: SecretString::from(function_key),
            log_format,
            sentry_dsn: env.get("SENTRY_DSN"),
            sentry_environment: env.get("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration backed entirely by in-memory store and queue.
    ///
    /// Used for local development and tests; the key is not strength-checked.
    #[must_use]
    pub fn in_memory(function_key: &str) -> Self {
        Self {
            storage_connection: SecretString::from("memory:"),
            queue_connection: SecretString::from("memory:"),
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            queue_batch_size: MAX_QUEUE_BATCH_SIZE,
            queue_visibility_timeout: Duration::from_secs(30),
            scan_page_size: MAX_SCAN_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 7071,
            function_key: SecretString::from(function_key),
            log_format: LogFormat::Text,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating blank values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or_default<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    fn parse_bounded<T>(
        &self,
        key: &str,
        default: T,
        range: std::ops::RangeInclusive<T>,
    ) -> Result<T, ConfigError>
    where
        T: std::str::FromStr + PartialOrd + std::fmt::Display,
        T::Err: std::fmt::Display,
    {
        let value = self.parse_or_default(key, default)?;
        if range.contains(&value) {
            Ok(value)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!(
                    "must be between {} and {} (got {value})",
                    range.start(),
                    range.end()
                ),
            ))
        }
    }

    fn connection_string(
        &self,
        key: &str,
        value: Option<String>,
    ) -> Result<SecretString, ConfigError> {
        let value = value.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        BackendKind::detect(&value)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        Ok(SecretString::from(value))
    }
}

/// Queue names follow the lowercase/digit/hyphen convention of the original queue service.
fn validate_queue_name(name: &str) -> Result<(), ConfigError> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if (3..=63).contains(&name.len())
        && valid_chars
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
    {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "ORDERS_QUEUE_NAME".to_string(),
            format!("`{name}` must be 3-63 lowercase letters, digits or single hyphens"),
        ))
    }
}

fn validate_function_key_length(key: &str, var_name: &str) -> Result<(), ConfigError> {
    if key.len() < MIN_FUNCTION_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_FUNCTION_KEY_LENGTH,
                key.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated key."
            ),
        ));
    }

    Ok(())
}

/// Expose the function key for comparison.
pub(crate) fn function_key_bytes(config: &FunctionsConfig) -> &[u8] {
    config.function_key.expose_secret().as_bytes()
}
