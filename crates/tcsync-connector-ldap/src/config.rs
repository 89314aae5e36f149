//! LDAP connection configuration.

use serde::{Deserialize, Serialize};
use tcsync_connector::{ConnectorError, ConnectorResult};

/// Configuration for the directory connection.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Directory server hostname or IP address.
    pub host: String,

    /// Directory server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Skip certificate verification.
    #[serde(default)]
    pub no_tls_verify: bool,

    /// Base DN all searches are scoped to (e.g., "dc=corp,dc=example,dc=com").
    pub base_dn: String,

    /// Bind principal. Active Directory accepts a UPN (`user@domain`) here.
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connect timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Per-operation timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// Attribute holding the login name.
    #[serde(default = "default_login_attribute")]
    pub login_attribute: String,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("no_tls_verify", &self.no_tls_verify)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .field("login_attribute", &self.login_attribute)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_login_attribute() -> String {
    "sAMAccountName".to_string()
}

impl LdapConfig {
    /// Create a new LDAP config with required fields.
    pub fn new(
        host: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            use_starttls: false,
            no_tls_verify: false,
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            connection_timeout_secs: default_timeout_secs(),
            operation_timeout_secs: default_timeout_secs(),
            login_attribute: default_login_attribute(),
        }
    }

    /// Set bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Set the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable SSL (LDAPS). Switches to 636 unless a custom port was set.
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        if self.port == default_ldap_port() {
            self.port = 636;
        }
        self
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.use_starttls = true;
        self
    }

    /// Set both connect and operation timeouts.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.connection_timeout_secs = secs;
        self.operation_timeout_secs = secs;
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.host.is_empty() {
            return Err(ConnectorError::invalid_configuration("host is required"));
        }

        if self.base_dn.is_empty() {
            return Err(ConnectorError::invalid_configuration("base_dn is required"));
        }

        if self.bind_dn.is_empty() {
            return Err(ConnectorError::invalid_configuration("bind_dn is required"));
        }

        if self.use_ssl && self.use_starttls {
            return Err(ConnectorError::invalid_configuration(
                "cannot use both SSL and STARTTLS",
            ));
        }

        if self.operation_timeout_secs == 0 {
            return Err(ConnectorError::invalid_configuration(
                "operation_timeout_secs must be greater than zero",
            ));
        }

        Ok(())
    }
}

/// Derive a base DN from a DNS domain: `corp.example.com` becomes
/// `dc=corp,dc=example,dc=com`.
pub fn base_dn_from_domain(domain: &str) -> Option<String> {
    let parts: Vec<&str> = domain
        .split('.')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(
        parts
            .iter()
            .map(|part| format!("dc={part}"))
            .collect::<Vec<_>>()
            .join(","),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ldap_config_new() {
        let config = LdapConfig::new("ad.corp.example.com", "dc=corp,dc=example,dc=com", "svc@corp.example.com");
        assert_eq!(config.port, 389);
        assert!(!config.use_ssl);
        assert_eq!(config.login_attribute, "sAMAccountName");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ldap_config_ssl() {
        let config = LdapConfig::new("ad", "dc=corp", "svc").with_ssl();
        assert!(config.use_ssl);
        assert_eq!(config.port, 636);
        assert_eq!(config.url(), "ldaps://ad:636");

        let custom = LdapConfig::new("ad", "dc=corp", "svc")
            .with_port(3269)
            .with_ssl();
        assert_eq!(custom.url(), "ldaps://ad:3269");
    }

    #[test]
    fn test_ldap_config_validation() {
        assert!(LdapConfig::new("", "dc=corp", "svc").validate().is_err());
        assert!(LdapConfig::new("ad", "", "svc").validate().is_err());
        assert!(LdapConfig::new("ad", "dc=corp", "").validate().is_err());

        let both = LdapConfig::new("ad", "dc=corp", "svc")
            .with_ssl()
            .with_starttls();
        assert!(both.validate().is_err());

        let zero = LdapConfig::new("ad", "dc=corp", "svc").with_timeout_secs(0);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_ldap_config_debug_redacts_password() {
        let config = LdapConfig::new("ad", "dc=corp", "svc").with_password("topSecret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("topSecret"));
        assert!(debug.contains("***REDACTED***"));
    }

    #[test]
    fn test_ldap_config_serialization() {
        let config = LdapConfig::new("ad", "dc=corp", "svc");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("bind_password"));

        let parsed: LdapConfig =
            serde_json::from_str(r#"{"host":"ad","base_dn":"dc=corp","bind_dn":"svc"}"#).unwrap();
        assert_eq!(parsed.port, 389);
        assert_eq!(parsed.operation_timeout_secs, 30);
    }

    #[test]
    fn test_base_dn_from_domain() {
        assert_eq!(
            base_dn_from_domain("corp.example.com").as_deref(),
            Some("dc=corp,dc=example,dc=com")
        );
        assert_eq!(base_dn_from_domain("local").as_deref(), Some("dc=local"));
        assert_eq!(base_dn_from_domain(""), None);
    }
}
