//! TeamCity REST wire models (`application/json` representation).

use serde::{Deserialize, Serialize};
use tcsync_connector::{DirectoryUser, TargetGroup, TargetUser};

/// `GET /app/rest/users` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default)]
    pub user: Vec<User>,
}

/// A user as TeamCity serializes it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// `GET /app/rest/userGroups` and user group list responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default)]
    pub group: Vec<Group>,
}

/// A group as TeamCity serializes it. `users` is only present on the
/// single-group representation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<UserList>,
}

/// `POST /app/rest/userGroups` body.
#[derive(Debug, Clone, Serialize)]
pub struct NewGroup<'a> {
    pub key: &'a str,
    pub name: &'a str,
}

/// `POST /app/rest/users` body.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser<'a> {
    pub username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}

impl<'a> From<&'a DirectoryUser> for NewUser<'a> {
    fn from(user: &'a DirectoryUser) -> Self {
        Self {
            username: &user.login_name,
            name: Some(user.display_name.as_str()).filter(|n| !n.is_empty()),
            email: user.mail.as_deref(),
        }
    }
}

impl From<User> for TargetUser {
    fn from(user: User) -> Self {
        TargetUser {
            id: user.id,
            username: user.username,
            display_name: user.name,
            href: user.href,
            email: user.email,
        }
    }
}

impl From<Group> for TargetGroup {
    fn from(group: Group) -> Self {
        TargetGroup {
            name: group.name.unwrap_or_default(),
            key: group.key,
            href: group.href,
            members: group
                .users
                .map(|u| u.user.into_iter().map(TargetUser::from).collect())
                .unwrap_or_default(),
        }
    }
}

impl From<&TargetGroup> for Group {
    fn from(group: &TargetGroup) -> Self {
        Group {
            key: group.key.clone(),
            name: Some(group.name.clone()).filter(|n| !n.is_empty()),
            href: group.href.clone(),
            users: None,
        }
    }
}
