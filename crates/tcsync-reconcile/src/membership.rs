//! Pending membership attachments for one pass.
//!
//! Attachments are grouped per user so that each user's group list is
//! rewritten at most once, no matter how many groups the user is added to.

use std::collections::{BTreeMap, HashSet};

use tcsync_connector::{TargetGroup, TargetUser};

/// Groups to add to a single user.
#[derive(Debug, Clone)]
pub struct PendingAttachment {
    pub user: TargetUser,
    pub groups: Vec<TargetGroup>,
}

/// Per-pass plan keyed by lower-cased username.
#[derive(Debug, Default)]
pub struct MembershipPlan {
    pending: BTreeMap<String, PendingAttachment>,
    // Dry-run only: logins reported as "would create" earlier in the pass.
    planned_users: HashSet<String>,
}

impl MembershipPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `user` for `group`. Returns `false` if already scheduled.
    pub fn schedule(&mut self, user: &TargetUser, group: &TargetGroup) -> bool {
        let entry = self
            .pending
            .entry(user.username.to_lowercase())
            .or_insert_with(|| PendingAttachment {
                user: user.clone(),
                groups: Vec::new(),
            });

        if entry.groups.iter().any(|g| same_target_group(g, group)) {
            return false;
        }
        entry.groups.push(group.clone());
        true
    }

    /// Record a user create that a dry run would issue. Returns `false` if
    /// the login (case-insensitive) was already recorded in this pass.
    pub fn plan_user_create(&mut self, login: &str) -> bool {
        self.planned_users.insert(login.to_lowercase())
    }

    /// Number of scheduled (user, group) edges.
    pub fn len(&self) -> usize {
        self.pending.values().map(|p| p.groups.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of distinct users with pending attachments.
    pub fn user_count(&self) -> usize {
        self.pending.len()
    }

    /// Consume the plan in username order.
    pub fn into_attachments(self) -> impl Iterator<Item = PendingAttachment> {
        self.pending.into_values()
    }
}

/// Groups that have neither key nor href yet (dry-run placeholders) compare
/// by name.
fn same_target_group(a: &TargetGroup, b: &TargetGroup) -> bool {
    let unidentified = |g: &TargetGroup| g.key.is_empty() && g.href.is_none();
    if unidentified(a) || unidentified(b) {
        return a.name == b.name;
    }
    a.same_group(b)
}
