//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (used for profile links and QR codes)
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `CLOUDINARY_CLOUD_NAME` - Image CDN cloud name
//! - `CLOUDINARY_UPLOAD_PRESET` - Unsigned upload preset
//! - `STRIPE_PUBLISHABLE_KEY` - Card payments publishable key (safe to expose in browser)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `PGCARDS_API_URL` - REST backend base URL (default: production host)
//! - `PGCARDS_API_TIMEOUT_SECS` - Backend request timeout (default: 15)
//! - `TRIAL_MODE` - Send the trial flag when creating payment intents (default: false)
//! - `GA4_MEASUREMENT_ID` - Google Analytics 4 measurement ID
//! - `GOOGLE_CLIENT_ID` - Google Identity Services client ID for "Sign in with Google"
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Production REST backend.
pub const DEFAULT_API_URL: &str = "https://api.pgcards.com/api";

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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// REST backend configuration
    pub api: ApiConfig,
    /// Image CDN configuration
    pub cloudinary: CloudinaryConfig,
    /// Card payments configuration
    pub payments: PaymentsConfig,
    /// Analytics tracking configuration
    pub analytics: AnalyticsConfig,
    /// Google Identity Services client ID
    pub google_client_id: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate
    pub sentry_traces_sample_rate: f32,
}

/// REST backend configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL without trailing slash (e.g., `https://api.pgcards.com/api`)
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Image CDN configuration for unsigned uploads.
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (appears in upload and delivery URLs)
    pub cloud_name: String,
    /// Unsigned upload preset
    pub upload_preset: String,
}

impl CloudinaryConfig {
    /// Unsigned upload endpoint for images.
    #[must_use]
    pub fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.cloud_name
        )
    }
}

/// Card payments configuration.
#[derive(Clone)]
pub struct PaymentsConfig {
    /// Publishable key handed to the browser SDK
    pub publishable_key: String,
    /// Whether new payment intents are created as trials
    pub trial_mode: bool,
}

impl std::fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Publishable keys are public, but keep only the prefix out of logs.
        let prefix: String = self.publishable_key.chars().take(8).collect();
        f.debug_struct("PaymentsConfig")
            .field("publishable_key", &format!("{prefix}…"))
            .field("trial_mode", &self.trial_mode)
            .finish()
    }
}

/// Analytics and tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfig {
    /// Google Analytics 4 measurement ID
    pub ga4_measurement_id: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            api: ApiConfig::from_env()?,
            cloudinary: CloudinaryConfig::from_env()?,
            payments: PaymentsConfig::from_env()?,
            analytics: AnalyticsConfig::from_env(),
            google_client_id: get_optional_env("GOOGLE_CLIENT_ID"),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_env_or_default("PGCARDS_API_URL", DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("PGCARDS_API_URL".to_string(), e.to_string())
        })?;
        let timeout_secs: u64 = parse_env("PGCARDS_API_TIMEOUT_SECS", "15")?;
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
            upload_preset: get_required_env("CLOUDINARY_UPLOAD_PRESET")?,
        })
    }
}

impl PaymentsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let publishable_key = get_required_env("STRIPE_PUBLISHABLE_KEY")?;
        if !publishable_key.starts_with("pk_") {
            return Err(ConfigError::InvalidEnvVar(
                "STRIPE_PUBLISHABLE_KEY".to_string(),
                "must be a publishable key (pk_...), never a secret key".to_string(),
            ));
        }
        Ok(Self {
            publishable_key,
            trial_mode: parse_env("TRIAL_MODE", "false")?,
        })
    }
}

impl AnalyticsConfig {
    fn from_env() -> Self {
        Self {
            ga4_measurement_id: get_optional_env("GA4_MEASUREMENT_ID"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
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
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            api: ApiConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                timeout: Duration::from_secs(1),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "pgcards".to_string(),
                upload_preset: "unsigned_cards".to_string(),
            },
            payments: PaymentsConfig {
                publishable_key: "pk_test_51Habcdefghijklmnop".to_string(),
                trial_mode: false,
            },
            analytics: AnalyticsConfig::default(),
            google_client_id: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-api-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        assert!(validate_secret_strength(&"a".repeat(40), "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_socket_addr_and_https() {
        let config = sample_config();
        assert_eq!(config.socket_addr().port(), 3000);
        assert!(!config.is_https());
    }

    #[test]
    fn test_cloudinary_upload_url() {
        let config = sample_config();
        assert_eq!(
            config.cloudinary.upload_url(),
            "https://api.cloudinary.com/v1_1/pgcards/image/upload"
        );
    }

    #[test]
    fn test_payments_debug_truncates_key() {
        let config = sample_config();
        let debug = format!("{:?}", config.payments);
        assert!(debug.contains("pk_test_"));
        assert!(!debug.contains("abcdefghijklmnop"));
    }
}
