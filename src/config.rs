//! Client configuration: credentials, endpoint and timeouts.

use std::time::Duration;

/// Default API host for all endpoints.
pub const OPENAI_API_URL: &str = "https://api.openai.com";

/// A secret string type for sensitive data like API keys.
/// Prevents accidental logging or display of secrets.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    /// Create a new secret string.
    pub fn new(s: String) -> Self {
        Self(s)
    }

    /// Get the underlying secret value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s.to_string())
    }
}

/// Configuration for a [`crate::client::Client`].
///
/// The API key and organization id are attached to every request. The
/// base URL is overridable for testing against a local server.
///
/// # Example
/// ```
/// use petalflow::config::Config;
/// use std::time::Duration;
///
/// let config = Config::new("sk-...", "org-...")
///     .with_timeout(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// API key used for bearer authentication.
    pub api_key: SecretString,

    /// Organization id sent in the `OpenAI-Organization` header.
    pub organization_id: String,

    /// Base URL for API endpoints.
    pub base_url: String,

    /// Connect/read timeout applied to both connections.
    pub timeout: Option<Duration>,
}

impl Config {
    /// Create a new configuration with the required credentials.
    pub fn new(api_key: impl Into<SecretString>, organization_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            organization_id: organization_id.into(),
            base_url: OPENAI_API_URL.to_string(),
            timeout: None,
        }
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
