//! Client traits
//!
//! The reconciler only talks to the outside world through these two traits.
//! The directory side is a stateful session and takes `&mut self`; the target
//! side is stateless per request and is shared across tasks.

use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::types::{DirectoryGroup, DirectoryUser, TargetGroup, TargetUser};

/// Read access to the directory service.
///
/// Every method takes `&mut self`: a directory session must be driven from a
/// single logical sequence and is never shared into concurrent tasks.
#[async_trait]
pub trait DirectoryClient: Send {
    /// Resolve all groups whose common name matches `name_pattern`.
    ///
    /// `*` in the pattern is a substring wildcard.
    async fn resolve_groups(&mut self, name_pattern: &str) -> ConnectorResult<Vec<DirectoryGroup>>;

    /// Resolve every person that is a transitive member of `group`.
    async fn resolve_group_members(
        &mut self,
        group: &DirectoryGroup,
    ) -> ConnectorResult<Vec<DirectoryUser>>;

    /// Resolve exactly one user by distinguished name.
    async fn resolve_user(&mut self, distinguished_name: &str) -> ConnectorResult<DirectoryUser>;
}

/// Inventory reads and mutations against the target server.
#[async_trait]
pub trait TargetClient: Send + Sync {
    /// All groups, without member lists.
    async fn list_groups(&self) -> ConnectorResult<Vec<TargetGroup>>;

    /// All users.
    async fn list_users(&self) -> ConnectorResult<Vec<TargetUser>>;

    /// Current members of `group`.
    async fn list_group_members(&self, group: &TargetGroup) -> ConnectorResult<Vec<TargetUser>>;

    /// Groups `user` currently belongs to.
    async fn list_user_groups(&self, user: &TargetUser) -> ConnectorResult<Vec<TargetGroup>>;

    /// Create a group named `name` under a freshly generated key.
    ///
    /// The returned record carries the key; its href may be absent.
    async fn create_group(&self, name: &str) -> ConnectorResult<TargetGroup>;

    /// Create a user from a directory record.
    async fn create_user(&self, user: &DirectoryUser) -> ConnectorResult<TargetUser>;

    /// Replace the full group list of `user`.
    async fn replace_user_groups(
        &self,
        user: &TargetUser,
        groups: &[TargetGroup],
    ) -> ConnectorResult<()>;

    /// Read-modify-write: append `groups` to the user's current group list.
    ///
    /// Groups the user already belongs to are not duplicated and no write is
    /// issued when nothing is missing. Returns the number of groups added.
    /// Must not run concurrently for the same user.
    async fn add_user_to_groups(
        &self,
        user: &TargetUser,
        groups: &[TargetGroup],
    ) -> ConnectorResult<usize> {
        let mut current = self.list_user_groups(user).await?;
        let mut added = 0;
        for group in groups {
            if !current.iter().any(|g| g.same_group(group)) {
                current.push(group.clone());
                added += 1;
            }
        }
        if added > 0 {
            self.replace_user_groups(user, &current).await?;
        }
        Ok(added)
    }

    /// Append a single group to the user's group list.
    async fn add_user_to_group(
        &self,
        user: &TargetUser,
        group: &TargetGroup,
    ) -> ConnectorResult<bool> {
        let added = self
            .add_user_to_groups(user, std::slice::from_ref(group))
            .await?;
        Ok(added > 0)
    }
}
