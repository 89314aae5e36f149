//! Command-line arguments and the connector configs derived from them.

use std::time::Duration;

use clap::Args;
use tcsync_connector_ldap::{base_dn_from_domain, LdapConfig};
use tcsync_connector_teamcity::TeamCityConfig;
use tcsync_reconcile::ReconcileOptions;

use crate::error::{CliError, CliResult};

/// Connection and sync arguments. Every flag with an `env` name can also
/// come from the environment or a `.env` file.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Directory login, `user@domain`
    #[arg(short = 'u', long, env = "TCSYNC_USERNAME")]
    pub username: String,

    /// Directory password
    #[arg(short = 'p', long, env = "TCSYNC_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// LDAP server host name
    #[arg(short = 's', long, env = "TCSYNC_LDAP_SERVER")]
    pub server: String,

    /// LDAP server port
    #[arg(long, env = "TCSYNC_LDAP_PORT", default_value_t = 389)]
    pub port: u16,

    /// Connect with LDAPS (port 636 unless --port is given)
    #[arg(long, conflicts_with = "starttls")]
    pub ldaps: bool,

    /// Upgrade the connection with STARTTLS
    #[arg(long)]
    pub starttls: bool,

    /// Search base; derived from the login's domain when omitted
    #[arg(long, env = "TCSYNC_BASE_DN")]
    pub base_dn: Option<String>,

    /// TeamCity server URL
    #[arg(short = 't', long, env = "TCSYNC_TEAMCITY_URL")]
    pub teamcity: String,

    /// TeamCity user; defaults to the local part of --username
    #[arg(long, env = "TCSYNC_TEAMCITY_USERNAME")]
    pub teamcity_username: Option<String>,

    /// TeamCity password; defaults to --password
    #[arg(long, env = "TCSYNC_TEAMCITY_PASSWORD", hide_env_values = true)]
    pub teamcity_password: Option<String>,

    /// Directory group name pattern (`*` is a wildcard); repeatable
    #[arg(
        short = 'g',
        long = "group",
        env = "TCSYNC_GROUPS",
        value_delimiter = ',',
        required = true
    )]
    pub groups: Vec<String>,

    /// Log what would change without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum user creates in flight
    #[arg(long, default_value_t = 8)]
    pub max_concurrent: usize,

    /// Deadline in seconds for each directory and TeamCity call
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification (LDAP and TeamCity)
    #[arg(long)]
    pub insecure: bool,
}

/// Everything a run needs, validated.
#[derive(Debug)]
pub struct SyncSettings {
    pub ldap: LdapConfig,
    pub teamcity: TeamCityConfig,
    pub options: ReconcileOptions,
    pub patterns: Vec<String>,
}

impl SyncArgs {
    pub fn into_settings(self) -> CliResult<SyncSettings> {
        let (local_part, domain) = split_login(&self.username)?;

        let base_dn = match self.base_dn.filter(|dn| !dn.trim().is_empty()) {
            Some(dn) => dn,
            None => domain.and_then(base_dn_from_domain).ok_or_else(|| {
                CliError::Config(format!(
                    "cannot derive a base DN from '{}'; use user@domain or pass --base-dn",
                    self.username
                ))
            })?,
        };

        let mut ldap = LdapConfig::new(self.server, base_dn, self.username.clone())
            .with_password(self.password.clone())
            .with_port(self.port)
            .with_timeout_secs(self.timeout_secs);
        if self.ldaps {
            ldap = ldap.with_ssl();
        }
        if self.starttls {
            ldap = ldap.with_starttls();
        }
        ldap.no_tls_verify = self.insecure;
        ldap.validate()?;

        let teamcity_username = self
            .teamcity_username
            .unwrap_or_else(|| local_part.to_string());
        let teamcity_password = self.teamcity_password.unwrap_or(self.password);
        let mut teamcity = TeamCityConfig::new(self.teamcity, teamcity_username)
            .with_password(teamcity_password)
            .with_timeout_secs(self.timeout_secs);
        if self.insecure {
            teamcity = teamcity.insecure();
        }
        teamcity.validate()?;

        let options = ReconcileOptions::default()
            .dry_run(self.dry_run)
            .with_max_concurrent_creates(self.max_concurrent)
            .with_call_timeout(Duration::from_secs(self.timeout_secs));
        options.validate()?;

        let patterns: Vec<String> = self
            .groups
            .iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        if patterns.is_empty() {
            return Err(CliError::Validation(
                "at least one non-empty --group pattern is required".to_string(),
            ));
        }

        Ok(SyncSettings {
            ldap,
            teamcity,
            options,
            patterns,
        })
    }
}

/// Split `user@domain` into its parts. A login without `@` has no domain.
fn split_login(login: &str) -> CliResult<(&str, Option<&str>)> {
    let login = login.trim();
    match login.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok((local, Some(domain)))
        }
        Some(_) => Err(CliError::Validation(format!(
            "'{login}' is not a valid user@domain login"
        ))),
        None if login.is_empty() => Err(CliError::Validation("username is empty".to_string())),
        None => Ok((login, None)),
    }
}
