//! Directory client over a single LDAP session.
//!
//! Implements [`DirectoryClient`] for Active Directory style schemas: groups
//! are `objectClass=group`, people are `objectClass=user` +
//! `objectCategory=Person`, and nested membership is flattened by the server
//! through the `LDAP_MATCHING_RULE_IN_CHAIN` matching rule.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use tcsync_connector::{ConnectorError, ConnectorResult, DirectoryClient, DirectoryGroup, DirectoryUser};

use crate::config::LdapConfig;
use crate::filter::{escape_filter_value, escape_name_pattern};

/// OID of the transitive ("in chain") matching rule.
pub const MATCHING_RULE_IN_CHAIN: &str = "1.2.840.113556.1.4.1941";

/// LDAP result code for invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Attributes fetched by the user point lookup.
const USER_ATTRIBUTES: [&str; 3] = ["sn", "givenName", "mail"];

/// Filter selecting groups by common name.
pub fn group_filter(name_pattern: &str) -> String {
    format!("(&(objectClass=group)(cn={}))", escape_name_pattern(name_pattern))
}

/// Filter selecting every person that is a transitive member of `group_dn`.
pub fn transitive_members_filter(group_dn: &str) -> String {
    format!(
        "(&(objectClass=user)(objectCategory=Person)(memberOf:{}:={}))",
        MATCHING_RULE_IN_CHAIN,
        escape_filter_value(group_dn)
    )
}

/// Filter selecting one entry by distinguished name.
pub fn dn_filter(distinguished_name: &str) -> String {
    format!("(distinguishedName={})", escape_filter_value(distinguished_name))
}

/// Directory session bound to one LDAP connection.
///
/// The session is owned exclusively by the caller; every operation takes
/// `&mut self` so the borrow checker serializes access.
pub struct LdapDirectory {
    config: LdapConfig,
    ldap: Ldap,
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LdapDirectory {
    /// Connect to the directory and perform a simple bind.
    ///
    /// A rejected bind is an [`ConnectorError::AuthError`]; there is no point
    /// continuing a run with an anonymous or failed session.
    #[instrument(skip(config), fields(host = %config.host, port = config.port))]
    pub async fn connect(config: LdapConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let url = config.url();
        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.connection_timeout_secs))
            .set_starttls(config.use_starttls)
            .set_no_tls_verify(config.no_tls_verify);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                ConnectorError::directory_unavailable_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        // Spawn the connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &config.bind_dn;
        let bind_password = config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .with_timeout(Duration::from_secs(config.operation_timeout_secs))
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| {
                ConnectorError::directory_unavailable_with_source(
                    format!("LDAP bind failed for {bind_dn}"),
                    e,
                )
            })?;

        if result.rc == RC_INVALID_CREDENTIALS {
            return Err(ConnectorError::AuthError {
                principal: bind_dn.clone(),
                message: "invalid credentials".to_string(),
            });
        }
        if result.rc != 0 {
            return Err(ConnectorError::AuthError {
                principal: bind_dn.clone(),
                message: format!("bind returned code {}: {}", result.rc, result.text),
            });
        }

        info!(host = %config.host, "LDAP connection established successfully");

        Ok(Self { config, ldap })
    }

    /// Unbind and drop the session.
    pub async fn close(mut self) -> ConnectorResult<()> {
        self.ldap.unbind().await.map_err(|e| {
            ConnectorError::directory_unavailable_with_source("LDAP unbind failed", e)
        })
    }

    /// Configuration this session was opened with.
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Subtree search under the configured base DN.
    async fn search(&mut self, filter: &str, attrs: Vec<&str>) -> ConnectorResult<Vec<SearchEntry>> {
        debug!(base_dn = %self.config.base_dn, filter = %filter, "LDAP search");

        let timeout = Duration::from_secs(self.config.operation_timeout_secs);
        let result = self
            .ldap
            .with_timeout(timeout)
            .search(&self.config.base_dn, Scope::Subtree, filter, attrs)
            .await
            .map_err(|e| {
                ConnectorError::directory_unavailable_with_source(
                    format!("search {filter} failed"),
                    e,
                )
            })?;

        let (entries, _res) = result.success().map_err(|e| {
            ConnectorError::directory_unavailable_with_source(
                format!("search {filter} failed"),
                e,
            )
        })?;

        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    #[instrument(skip(self))]
    async fn resolve_groups(&mut self, name_pattern: &str) -> ConnectorResult<Vec<DirectoryGroup>> {
        let filter = group_filter(name_pattern);
        let entries = self.search(&filter, vec!["cn", "member"]).await?;

        let groups: Vec<DirectoryGroup> = entries.into_iter().map(group_from_entry).collect();
        info!(pattern = %name_pattern, count = groups.len(), "Resolved directory groups");
        Ok(groups)
    }

    #[instrument(skip(self, group), fields(group = %group.name))]
    async fn resolve_group_members(
        &mut self,
        group: &DirectoryGroup,
    ) -> ConnectorResult<Vec<DirectoryUser>> {
        let filter = transitive_members_filter(&group.distinguished_name);
        // "1.1" requests no attributes; only the DNs are needed here.
        let entries = self.search(&filter, vec!["1.1"]).await?;

        let mut users = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.resolve_user(&entry.dn).await {
                Ok(user) => users.push(user),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(member = %entry.dn, error = %e, "Skipping unresolvable group member");
                }
            }
        }

        debug!(count = users.len(), "Resolved group members");
        Ok(users)
    }

    async fn resolve_user(&mut self, distinguished_name: &str) -> ConnectorResult<DirectoryUser> {
        let filter = dn_filter(distinguished_name);
        let login_attribute = self.config.login_attribute.clone();
        let mut attrs: Vec<&str> = USER_ATTRIBUTES.to_vec();
        attrs.push(&login_attribute);

        let entries = self.search(&filter, attrs).await?;
        let entry = exactly_one(
            entries,
            &filter,
            ConnectorError::UserNotFound {
                identifier: distinguished_name.to_string(),
            },
        )?;

        user_from_entry(&entry, &login_attribute)
    }
}

/// Reduce a result list to its single entry.
///
/// Zero entries yields `not_found`; more than one yields
/// [`ConnectorError::AmbiguousResult`].
pub fn exactly_one<T>(
    entries: Vec<T>,
    identifier: &str,
    not_found: ConnectorError,
) -> ConnectorResult<T> {
    let count = entries.len();
    let mut iter = entries.into_iter();
    match (iter.next(), count) {
        (None, _) => Err(not_found),
        (Some(entry), 1) => Ok(entry),
        (Some(_), count) => Err(ConnectorError::AmbiguousResult {
            identifier: identifier.to_string(),
            count,
        }),
    }
}

/// Case-insensitive lookup of the values of an attribute.
fn attr_values<'a>(entry: &'a SearchEntry, name: &str) -> &'a [String] {
    entry
        .attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values.as_slice())
        .unwrap_or(&[])
}

fn first_attr<'a>(entry: &'a SearchEntry, name: &str) -> Option<&'a str> {
    attr_values(entry, name)
        .first()
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

/// Build a [`DirectoryGroup`] from a group entry.
///
/// Falls back to the first RDN value when `cn` was not returned.
pub fn group_from_entry(entry: SearchEntry) -> DirectoryGroup {
    let name = first_attr(&entry, "cn")
        .map(str::to_string)
        .unwrap_or_else(|| rdn_value(&entry.dn));
    let member_refs = attr_values(&entry, "member").to_vec();

    DirectoryGroup {
        name,
        distinguished_name: entry.dn,
        member_refs,
    }
}

/// Build a [`DirectoryUser`] from a person entry.
///
/// An entry without a login attribute cannot be matched against the target
/// and is reported as not found.
pub fn user_from_entry(entry: &SearchEntry, login_attribute: &str) -> ConnectorResult<DirectoryUser> {
    let login_name = first_attr(entry, login_attribute).ok_or_else(|| {
        ConnectorError::UserNotFound {
            identifier: format!("{} (no {login_attribute})", entry.dn),
        }
    })?;

    let given = first_attr(entry, "givenName").unwrap_or("");
    let surname = first_attr(entry, "sn").unwrap_or("");
    let display_name = format!("{given} {surname}").trim().to_string();

    Ok(DirectoryUser {
        display_name,
        login_name: login_name.to_string(),
        mail: first_attr(entry, "mail").map(str::to_string),
    })
}

/// Value of the leading RDN: `CN=QA,OU=Groups,DC=corp` gives `QA`.
fn rdn_value(dn: &str) -> String {
    let mut rdn = String::new();
    let mut escaped = false;
    for ch in dn.chars() {
        if escaped {
            rdn.push(ch);
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == ',' {
            break;
        } else {
            rdn.push(ch);
        }
    }
    rdn.split_once('=')
        .map(|(_, v)| v.trim().to_string())
        .unwrap_or(rdn)
}
