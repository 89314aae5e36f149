//! TeamCity connection configuration.

use serde::{Deserialize, Serialize};
use tcsync_connector::{ConnectorError, ConnectorResult};

/// Configuration for the TeamCity REST client.
#[derive(Clone, Serialize, Deserialize)]
pub struct TeamCityConfig {
    /// Server root, e.g. `https://teamcity.example.com` or
    /// `https://ci.example.com/teamcity`.
    pub base_url: String,

    /// Basic-auth username.
    pub username: String,

    /// Basic-auth password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Verify the server certificate.
    #[serde(default = "default_true")]
    pub tls_verify: bool,
}

impl std::fmt::Debug for TeamCityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamCityConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("tls_verify", &self.tls_verify)
            .finish()
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl TeamCityConfig {
    /// Create a config with required fields.
    pub fn new(base_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: None,
            request_timeout_secs: default_request_timeout_secs(),
            tls_verify: true,
        }
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Disable certificate verification.
    #[must_use]
    pub fn insecure(mut self) -> Self {
        self.tls_verify = false;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.base_url.is_empty() {
            return Err(ConnectorError::invalid_configuration("base_url is required"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConnectorError::invalid_configuration(format!(
                "base_url must be an http(s) URL, got {}",
                self.base_url
            )));
        }
        if self.username.is_empty() {
            return Err(ConnectorError::invalid_configuration("username is required"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConnectorError::invalid_configuration(
                "request_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}
