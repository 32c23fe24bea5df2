//! Sync layer configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPSYNC_API_BASE_URL` - Cart/wishlist backend base URL. When unset the
//!   layer runs in local-only mode.
//! - `SHOPSYNC_API_TOKEN` - Bearer token sent with every backend request
//! - `SHOPSYNC_DATA_DIR` - Directory for per-user local storage (default: `.shopsync`)
//! - `SHOPSYNC_CURRENCY` - ISO 4217 code used to display totals (default: USD)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use shopsync_core::CurrencyCode;

const DEFAULT_DATA_DIR: &str = ".shopsync";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Sync layer configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backend connection, `None` for local-only mode
    pub api: Option<ApiConfig>,
    /// Directory for per-user local storage
    pub data_dir: PathBuf,
    /// Currency used when displaying totals
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
}

/// Backend connection settings.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.example.com/v1`
    pub base_url: Url,
    /// Bearer token
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            currency: CurrencyCode::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if the
    /// API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let data_dir = PathBuf::from(get_env_or_default("SHOPSYNC_DATA_DIR", DEFAULT_DATA_DIR));
        let currency = get_env_or_default("SHOPSYNC_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOPSYNC_CURRENCY".to_string(), e))?;

        Ok(Self {
            api,
            data_dir,
            currency,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(raw) = get_optional_env("SHOPSYNC_API_BASE_URL") else {
            return Ok(None);
        };
        let base_url = parse_base_url(&raw, "SHOPSYNC_API_BASE_URL")?;
        let token = get_optional_env("SHOPSYNC_API_TOKEN")
            .map(|value| {
                validate_token(&value, "SHOPSYNC_API_TOKEN")?;
                Ok(SecretString::from(value))
            })
            .transpose()?;

        Ok(Some(Self { base_url, token }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a backend base URL; only http(s) URLs with a host are accepted.
fn parse_base_url(raw: &str, var_name: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("expected an http(s) URL with a host, got '{raw}'"),
        ));
    }
    Ok(url)
}

/// Reject tokens that are obviously copied from a template.
fn validate_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = token.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url() {
        let url = parse_base_url("https://api.shop.test/v1", "TEST_VAR").unwrap();
        assert_eq!(url.host_str(), Some("api.shop.test"));

        assert!(parse_base_url("not a url", "TEST_VAR").is_err());
        assert!(matches!(
            parse_base_url("ftp://files.shop.test", "TEST_VAR"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_validate_token_placeholder() {
        let result = validate_token("your-token-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
        assert!(validate_token("CHANGEME", "TEST_VAR").is_err());
        assert!(validate_token("eyJhbGciOiJSUzI1NiJ9.payload.sig", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_default_is_local_only() {
        let config = SyncConfig::default();
        assert!(config.api.is_none());
        assert_eq!(config.data_dir, PathBuf::from(".shopsync"));
        assert_eq!(config.currency, CurrencyCode::USD);
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let config = ApiConfig {
            base_url: Url::parse("https://api.shop.test").unwrap(),
            token: Some(SecretString::from("super_secret_bearer")),
        };
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("api.shop.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer"));
    }
}
