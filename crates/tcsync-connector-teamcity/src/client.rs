//! TeamCity REST client (reqwest-based).
//!
//! Provides a `TeamCityClient` that reads and extends the user/group
//! inventory of a TeamCity server through `/app/rest`.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use tcsync_connector::{
    generate_group_key, ConnectorError, ConnectorResult, DirectoryUser, TargetClient, TargetGroup,
    TargetUser,
};

use crate::config::TeamCityConfig;
use crate::models::{Group, GroupList, NewGroup, NewUser, UserList};

/// TeamCity HTTP client for inventory reads and additive provisioning.
///
/// Cheap to clone; the underlying connection pool is shared, so a single
/// client can serve concurrent requests.
#[derive(Debug, Clone)]
pub struct TeamCityClient {
    /// Server root without trailing slash.
    base_url: Url,
    username: String,
    password: Option<String>,
    http_client: Client,
    request_timeout_secs: u64,
}

impl TeamCityClient {
    /// Create a new client from configuration.
    pub fn new(config: TeamCityConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(!config.tls_verify)
            .user_agent(concat!("tcsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Self::with_http_client(config, http_client)
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    pub fn with_http_client(config: TeamCityConfig, http_client: Client) -> ConnectorResult<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            ConnectorError::invalid_configuration(format!(
                "invalid base_url {}: {e}",
                config.base_url
            ))
        })?;

        Ok(Self {
            base_url,
            username: config.username,
            password: config.password,
            http_client,
            request_timeout_secs: config.request_timeout_secs,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `<base>/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> ConnectorResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConnectorError::invalid_configuration(format!(
                    "base_url {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Resolve a server-provided href (absolute path) against the server root.
    fn resolve_href(&self, href: &str) -> ConnectorResult<Url> {
        self.base_url.join(href).map_err(|e| {
            ConnectorError::invalid_configuration(format!("invalid href {href}: {e}"))
        })
    }

    /// Location of a group's own representation.
    fn group_url(&self, group: &TargetGroup) -> ConnectorResult<Url> {
        match &group.href {
            Some(href) => self.resolve_href(href),
            None => self.endpoint(&["app", "rest", "userGroups", &format!("key:{}", group.key)]),
        }
    }

    fn user_groups_url(&self, user: &TargetUser) -> ConnectorResult<Url> {
        self.endpoint(&["app", "rest", "users", &user.username, "groups"])
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .basic_auth(&self.username, self.password.as_deref())
            .header(header::ACCEPT, "application/json")
    }

    // ── Internal HTTP Methods ─────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> ConnectorResult<T> {
        debug!("TeamCity GET {}", url);
        let endpoint = url.path().to_string();
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| self.transport_error(&endpoint, e))?;
        self.handle_response(&endpoint, response).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &B,
        identifier: &str,
    ) -> ConnectorResult<()> {
        debug!("TeamCity {} {}", method, url);
        let endpoint = url.path().to_string();
        let is_create = method == reqwest::Method::POST;
        let response = self
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(&endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());

        if is_create && status == StatusCode::CONFLICT {
            return Err(ConnectorError::CreateConflict {
                identifier: identifier.to_string(),
                body,
            });
        }

        warn!(endpoint = %endpoint, status = status.as_u16(), body = %body, "TeamCity rejected request");
        Err(ConnectorError::TargetRejected {
            endpoint,
            status: status.as_u16(),
            body,
        })
    }

    // ── Response Handling ─────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        response: reqwest::Response,
    ) -> ConnectorResult<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            warn!(endpoint = %endpoint, status = status.as_u16(), body = %body, "TeamCity rejected request");
            return Err(ConnectorError::TargetRejected {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(endpoint, e))?;
        serde_json::from_str(&body).map_err(|e| ConnectorError::TargetDecodeError {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    fn transport_error(&self, endpoint: &str, error: reqwest::Error) -> ConnectorError {
        if error.is_timeout() {
            ConnectorError::Timeout {
                operation: format!("request to {endpoint}"),
                timeout_secs: self.request_timeout_secs,
            }
        } else {
            ConnectorError::target_unavailable_with_source(
                format!("request to {endpoint} failed"),
                error,
            )
        }
    }
}

#[async_trait]
impl TargetClient for TeamCityClient {
    async fn list_groups(&self) -> ConnectorResult<Vec<TargetGroup>> {
        let url = self.endpoint(&["app", "rest", "userGroups"])?;
        let list: GroupList = self.get(url).await?;
        Ok(list.group.into_iter().map(TargetGroup::from).collect())
    }

    async fn list_users(&self) -> ConnectorResult<Vec<TargetUser>> {
        let url = self.endpoint(&["app", "rest", "users"])?;
        let list: UserList = self.get(url).await?;
        Ok(list.user.into_iter().map(TargetUser::from).collect())
    }

    async fn list_group_members(&self, group: &TargetGroup) -> ConnectorResult<Vec<TargetUser>> {
        let url = self.group_url(group)?;
        let group: Group = self.get(url).await?;
        Ok(TargetGroup::from(group).members)
    }

    async fn list_user_groups(&self, user: &TargetUser) -> ConnectorResult<Vec<TargetGroup>> {
        let url = self.user_groups_url(user)?;
        let list: GroupList = self.get(url).await?;
        Ok(list.group.into_iter().map(TargetGroup::from).collect())
    }

    #[instrument(skip(self))]
    async fn create_group(&self, name: &str) -> ConnectorResult<TargetGroup> {
        let key = generate_group_key();
        let url = self.endpoint(&["app", "rest", "userGroups"])?;
        self.send_json(
            reqwest::Method::POST,
            url,
            &NewGroup { key: &key, name },
            name,
        )
        .await?;

        Ok(TargetGroup {
            key,
            name: name.to_string(),
            href: None,
            members: Vec::new(),
        })
    }

    #[instrument(skip(self, user), fields(user = %user.login_name))]
    async fn create_user(&self, user: &DirectoryUser) -> ConnectorResult<TargetUser> {
        let url = self.endpoint(&["app", "rest", "users"])?;
        self.send_json(
            reqwest::Method::POST,
            url,
            &NewUser::from(user),
            &user.login_name,
        )
        .await?;

        Ok(TargetUser {
            id: None,
            username: user.login_name.clone(),
            display_name: Some(user.display_name.clone()).filter(|n| !n.is_empty()),
            href: None,
            email: user.mail.clone(),
        })
    }

    #[instrument(skip(self, user, groups), fields(user = %user.username, groups = groups.len()))]
    async fn replace_user_groups(
        &self,
        user: &TargetUser,
        groups: &[TargetGroup],
    ) -> ConnectorResult<()> {
        let url = self.user_groups_url(user)?;
        let body = GroupList {
            count: None,
            group: groups.iter().map(Group::from).collect(),
        };
        self.send_json(reqwest::Method::PUT, url, &body, &user.username)
            .await
    }
}
