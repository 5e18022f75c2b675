//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_BASE_URL` - Public URL for the admin panel
//! - `ADMIN_PASSWORD_HASH` - Argon2 PHC string of the operator password
//!   (generate with `pgd-cli operator hash-password`)
//!
//! ## Object storage (one backend required)
//! - `OBJECT_STORAGE_URL` - Bucket endpoint receiving `PUT` uploads
//! - `OBJECT_STORAGE_TOKEN` - Bearer token for the bucket (high entropy)
//! - `OBJECT_STORAGE_PUBLIC_URL` - Base URL objects are served from
//!
//! or
//!
//! - `UPLOADS_DIR` - Local directory for product images
//! - `UPLOADS_PUBLIC_URL` - Base URL the directory is served from
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_TRUSTED_PROXIES` - Comma-separated proxy IPs whose `X-Forwarded-For`
//!   is honoured for login rate limiting (default: none)
//! - `LOG_FORMAT` - `json` for JSON logs, anything else for plain text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use argon2::PasswordHash;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

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

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin panel
    pub base_url: String,
    /// Argon2 PHC string the login password is checked against
    pub password_hash: SecretString,
    /// Where product images are uploaded
    pub object_storage: ObjectStorageConfig,
    /// Reverse proxies allowed to report the client address
    pub trusted_proxies: Vec<IpAddr>,
    /// Emit JSON logs
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Object storage backend for product images.
///
/// Implements `Debug` manually to redact the bucket token.
#[derive(Clone)]
pub enum ObjectStorageConfig {
    /// `PUT` uploads to a bucket endpoint.
    Http {
        endpoint: String,
        token: SecretString,
        public_url: String,
    },
    /// Files written below a local directory.
    Filesystem { dir: PathBuf, public_url: String },
}

impl std::fmt::Debug for ObjectStorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                endpoint,
                public_url,
                ..
            } => f
                .debug_struct("Http")
                .field("endpoint", endpoint)
                .field("token", &"[REDACTED]")
                .field("public_url", public_url)
                .finish(),
            Self::Filesystem { dir, public_url } => f
                .debug_struct("Filesystem")
                .field("dir", dir)
                .field("public_url", public_url)
                .finish(),
        }
    }
}

impl ObjectStorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        if let Some(endpoint) = get_optional_env("OBJECT_STORAGE_URL") {
            return Ok(Self::Http {
                endpoint,
                token: get_validated_secret("OBJECT_STORAGE_TOKEN")?,
                public_url: get_required_env("OBJECT_STORAGE_PUBLIC_URL")?,
            });
        }

        match (
            get_optional_env("UPLOADS_DIR"),
            get_optional_env("UPLOADS_PUBLIC_URL"),
        ) {
            (Some(dir), Some(public_url)) => Ok(Self::Filesystem {
                dir: PathBuf::from(dir),
                public_url,
            }),
            (None, None) => Err(ConfigError::MissingEnvVar(
                "OBJECT_STORAGE_URL or UPLOADS_DIR".to_string(),
            )),
            _ => Err(ConfigError::InvalidEnvVar(
                "UPLOADS_*".to_string(),
                "Both UPLOADS_DIR and UPLOADS_PUBLIC_URL must be set together".to_string(),
            )),
        }
    }
}

impl AdminConfig {
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

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("ADMIN_BASE_URL")?;
        let password_hash = get_password_hash("ADMIN_PASSWORD_HASH")?;
        let object_storage = ObjectStorageConfig::from_env()?;
        let trusted_proxies = get_optional_env("ADMIN_TRUSTED_PROXIES")
            .map_or(Ok(Vec::new()), |raw| parse_ip_list("ADMIN_TRUSTED_PROXIES", &raw))?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            password_hash,
            object_storage,
            trusted_proxies,
            json_logs: is_json_log_format(get_optional_env("LOG_FORMAT").as_deref()),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_rate("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// The operator password hash, for verification only.
    #[must_use]
    pub fn password_hash(&self) -> &str {
        self.password_hash.expose_secret().trim()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

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

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a sample rate in `0.0..=1.0`.
fn get_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| parse_rate(key, &raw))
}

fn parse_rate(key: &str, raw: &str) -> Result<f32, ConfigError> {
    let rate = raw
        .trim()
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

fn parse_ip_list(key: &str, raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<IpAddr>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), format!("{entry}: {e}")))
        })
        .collect()
}

fn is_json_log_format(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("json"))
}

/// Load the operator password hash, rejecting anything that is not a PHC string.
fn get_password_hash(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_password_hash(&value, key)?;
    Ok(SecretString::from(value))
}

fn validate_password_hash(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let parsed = PasswordHash::new(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !parsed.algorithm.as_str().starts_with("argon2") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("expected an argon2 hash (got {})", parsed.algorithm),
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
    let len = s.len() as f64;
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
mod tests {
    use super::*;

    // Well-formed Argon2id PHC string; the digest is not checked here.
    const HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$Zw3gQ3mXPnYLbDOLSkQCqCg5hpGlAf1J6ySBP7B0BDU";

    fn config() -> AdminConfig {
        AdminConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "http://localhost:3001".to_string(),
            password_hash: SecretString::from(HASH),
            object_storage: ObjectStorageConfig::Http {
                endpoint: "https://bucket.test/upload".to_string(),
                token: SecretString::from("tk_9fQ2xLm7Rz4Wb8Nc"),
                public_url: "https://cdn.test".to_string(),
            },
            trusted_proxies: Vec::new(),
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_is_secure() {
        let mut config = config();
        assert!(!config.is_secure());
        config.base_url = "https://admin.pg.test".to_string();
        assert!(config.is_secure());
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
        let err = validate_secret_strength("your-token-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let err = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_password_hash() {
        assert!(validate_password_hash(HASH, "ADMIN_PASSWORD_HASH").is_ok());
        assert!(matches!(
            validate_password_hash("letmein", "ADMIN_PASSWORD_HASH"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_parse_rate_bounds() {
        assert!((parse_rate("R", "0.5").unwrap() - 0.5).abs() < f32::EPSILON);
        assert!(parse_rate("R", "1.5").is_err());
        assert!(parse_rate("R", "lots").is_err());
    }

    #[test]
    fn test_parse_ip_list() {
        let proxies = parse_ip_list("P", " 10.0.0.1, ::1 ,").unwrap();
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[0].to_string(), "10.0.0.1");
        assert_eq!(proxies[1].to_string(), "::1");
        assert!(parse_ip_list("P", "").unwrap().is_empty());
        assert!(matches!(
            parse_ip_list("P", "10.0.0.1, proxy.internal"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", config());
        assert!(debug_output.contains("bucket.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tk_9fQ2xLm7Rz4Wb8Nc"));
        assert!(!debug_output.contains("argon2id"));
    }
}
