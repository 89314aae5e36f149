//! Identity model shared by the directory and target connectors.

/// A group read from the directory. Immutable for the duration of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryGroup {
    /// Common name, used verbatim as the target group name.
    pub name: String,
    /// Distinguished name.
    pub distinguished_name: String,
    /// Raw `member` references in directory order.
    pub member_refs: Vec<String>,
}

/// A person resolved from a directory member reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectoryUser {
    /// `givenName sn`.
    pub display_name: String,
    /// Login attribute; the matching key against target usernames.
    pub login_name: String,
    pub mail: Option<String>,
}

impl DirectoryUser {
    /// Lower-cased login, the key used for all user comparisons.
    pub fn login_key(&self) -> String {
        self.login_name.to_lowercase()
    }
}

/// A user as known to the target server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetUser {
    pub id: Option<i64>,
    pub username: String,
    pub display_name: Option<String>,
    pub href: Option<String>,
    pub email: Option<String>,
}

impl TargetUser {
    /// Case-insensitive comparison against a directory login.
    pub fn matches_login(&self, login: &str) -> bool {
        self.username.to_lowercase() == login.to_lowercase()
    }
}

/// A group as known to the target server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetGroup {
    /// Opaque identifier generated client-side on create.
    pub key: String,
    pub name: String,
    /// Resource locator; `None` until the server has echoed it back.
    pub href: Option<String>,
    pub members: Vec<TargetUser>,
}

impl TargetGroup {
    /// Whether a user with the given login is a member (case-insensitive).
    pub fn has_member(&self, login: &str) -> bool {
        self.members.iter().any(|m| m.matches_login(login))
    }

    /// Whether two records denote the same target group.
    ///
    /// Keys are compared first; the href is used when either side lacks a key.
    pub fn same_group(&self, other: &TargetGroup) -> bool {
        if !self.key.is_empty() && !other.key.is_empty() {
            return self.key == other.key;
        }
        matches!((&self.href, &other.href), (Some(a), Some(b)) if a == b)
    }
}

/// Find a group by exact (case-sensitive) name.
pub fn find_group<'a>(groups: &'a [TargetGroup], name: &str) -> Option<&'a TargetGroup> {
    groups.iter().find(|g| g.name == name)
}

/// Find a user by login (case-insensitive).
pub fn find_user<'a>(users: &'a [TargetUser], login: &str) -> Option<&'a TargetUser> {
    users.iter().find(|u| u.matches_login(login))
}
