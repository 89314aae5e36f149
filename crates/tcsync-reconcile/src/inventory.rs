//! Target inventory snapshots.
//!
//! A failed fetch yields an empty snapshot and a warning naming the fetch.
//! Callers then schedule work as if nothing existed; the membership flush
//! re-reads each user's groups so this never duplicates an edge.

use std::future::Future;
use std::time::Duration;

use tcsync_connector::{ConnectorError, ConnectorResult, TargetClient, TargetGroup, TargetUser};
use tracing::warn;

/// Run `call` under a deadline, mapping expiry to [`ConnectorError::Timeout`].
///
/// The reported seconds round up, so a sub-second deadline reports 1.
pub async fn with_deadline<T, F>(deadline: Duration, operation: &str, call: F) -> ConnectorResult<T>
where
    F: Future<Output = ConnectorResult<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(ConnectorError::Timeout {
            operation: operation.to_string(),
            timeout_secs: deadline.as_secs() + u64::from(deadline.subsec_nanos() > 0),
        }),
    }
}

/// All target groups, or empty on failure.
pub async fn groups_or_empty<T>(target: &T, deadline: Duration) -> Vec<TargetGroup>
where
    T: TargetClient + ?Sized,
{
    match with_deadline(deadline, "list_groups", target.list_groups()).await {
        Ok(groups) => groups,
        Err(e) => {
            warn!(error = %e, "Failed to fetch group list, treating as empty");
            Vec::new()
        }
    }
}

/// All target users, or empty on failure.
pub async fn users_or_empty<T>(target: &T, deadline: Duration) -> Vec<TargetUser>
where
    T: TargetClient + ?Sized,
{
    match with_deadline(deadline, "list_users", target.list_users()).await {
        Ok(users) => users,
        Err(e) => {
            warn!(error = %e, "Failed to fetch user list, treating as empty");
            Vec::new()
        }
    }
}

/// Current members of `group`, or empty on failure.
pub async fn group_members_or_empty<T>(
    target: &T,
    group: &TargetGroup,
    deadline: Duration,
) -> Vec<TargetUser>
where
    T: TargetClient + ?Sized,
{
    match with_deadline(deadline, "list_group_members", target.list_group_members(group)).await {
        Ok(members) => members,
        Err(e) => {
            warn!(
                group = %group.name,
                error = %e,
                "Failed to fetch group members, treating as empty"
            );
            Vec::new()
        }
    }
}
