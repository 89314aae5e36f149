//! In-memory directory that serves fixed groups and members.

use std::collections::HashMap;

use async_trait::async_trait;
use tcsync_connector::{
    ConnectorError, ConnectorResult, DirectoryClient, DirectoryGroup, DirectoryUser,
};

/// How the fake directory should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryFailure {
    /// Every search fails as if the server went away.
    Unavailable,
    /// Member resolution reports the group as gone.
    MembersNotFound,
    /// Member resolution works for the first `n` groups, then the server
    /// goes away.
    MembersUnavailableAfter(usize),
}

#[derive(Default)]
pub struct FakeDirectory {
    groups: Vec<DirectoryGroup>,
    members: HashMap<String, Vec<DirectoryUser>>,
    failure: Option<DirectoryFailure>,
    member_lookups: usize,
    pub searches: usize,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group `cn` with the given member logins.
    pub fn with_group(mut self, name: &str, logins: &[&str]) -> Self {
        let dn = format!("CN={name},OU=Groups,DC=corp,DC=example,DC=com");
        let users: Vec<DirectoryUser> = logins.iter().map(|l| directory_user(l)).collect();
        self.groups.push(DirectoryGroup {
            name: name.to_string(),
            distinguished_name: dn.clone(),
            member_refs: users
                .iter()
                .map(|u| format!("CN={},OU=People,DC=corp,DC=example,DC=com", u.login_name))
                .collect(),
        });
        self.members.insert(dn, users);
        self
    }

    pub fn failing(mut self, failure: DirectoryFailure) -> Self {
        self.failure = Some(failure);
        self
    }
}

pub fn directory_user(login: &str) -> DirectoryUser {
    DirectoryUser {
        display_name: format!("User {login}"),
        login_name: login.to_string(),
        mail: Some(format!("{}@corp.example.com", login.to_lowercase())),
    }
}

/// `*` matches any run of characters; everything else literally, ignoring case.
fn matches_pattern(pattern: &str, name: &str) -> bool {
    let name = name.to_lowercase();
    let parts: Vec<String> = pattern.to_lowercase().split('*').map(String::from).collect();
    if parts.len() == 1 {
        return name == parts[0];
    }

    let mut rest = name.as_str();
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part.as_str()) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part.as_str());
        } else {
            match rest.find(part.as_str()) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn resolve_groups(&mut self, name_pattern: &str) -> ConnectorResult<Vec<DirectoryGroup>> {
        self.searches += 1;
        if self.failure == Some(DirectoryFailure::Unavailable) {
            return Err(ConnectorError::directory_unavailable("connection reset by peer"));
        }
        Ok(self
            .groups
            .iter()
            .filter(|g| matches_pattern(name_pattern, &g.name))
            .cloned()
            .collect())
    }

    async fn resolve_group_members(
        &mut self,
        group: &DirectoryGroup,
    ) -> ConnectorResult<Vec<DirectoryUser>> {
        self.searches += 1;
        self.member_lookups += 1;
        match self.failure {
            Some(DirectoryFailure::MembersUnavailableAfter(n)) if self.member_lookups > n => {
                Err(ConnectorError::directory_unavailable("connection reset by peer"))
            }
            Some(DirectoryFailure::Unavailable) => {
                Err(ConnectorError::directory_unavailable("connection reset by peer"))
            }
            Some(DirectoryFailure::MembersNotFound) => Err(ConnectorError::GroupNotFound {
                identifier: group.distinguished_name.clone(),
            }),
            _ => Ok(self
                .members
                .get(&group.distinguished_name)
                .cloned()
                .unwrap_or_default()),
        }
    }

    async fn resolve_user(&mut self, distinguished_name: &str) -> ConnectorResult<DirectoryUser> {
        self.searches += 1;
        self.members
            .values()
            .flatten()
            .find(|u| distinguished_name.starts_with(&format!("CN={},", u.login_name)))
            .cloned()
            .ok_or_else(|| ConnectorError::UserNotFound {
                identifier: distinguished_name.to_string(),
            })
    }
}

