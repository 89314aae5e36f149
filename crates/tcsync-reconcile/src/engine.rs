//! Reconciliation engine.
//!
//! One pass per group-name pattern:
//!
//! 1. ensure the target group exists (create, then re-read for its href),
//! 2. ensure every directory member exists as a target user (creates fan out
//!    and are joined before continuing),
//! 3. schedule missing memberships into a per-user plan.
//!
//! After all groups of the pass, or when a fatal error stops it early, the
//! plan is flushed with one read-modify-write per user. Nothing is ever
//! deleted.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tcsync_connector::{
    find_group, find_user, ConnectorError, ConnectorResult, DirectoryClient, DirectoryGroup,
    DirectoryUser, TargetClient, TargetGroup, TargetUser,
};

use crate::inventory::{group_members_or_empty, groups_or_empty, users_or_empty, with_deadline};
use crate::membership::{MembershipPlan, PendingAttachment};
use crate::options::ReconcileOptions;
use crate::report::SyncReport;

/// Drives additive reconciliation of directory groups into the target.
///
/// The target client is shared with spawned create tasks; the directory
/// session is borrowed exclusively per pass.
pub struct Reconciler<T: TargetClient + ?Sized + 'static> {
    target: Arc<T>,
    options: ReconcileOptions,
    cancel: CancellationToken,
}

impl<T: TargetClient + ?Sized + 'static> Reconciler<T> {
    pub fn new(target: Arc<T>, options: ReconcileOptions) -> ConnectorResult<Self> {
        options.validate()?;
        Ok(Self {
            target,
            options,
            cancel: CancellationToken::new(),
        })
    }

    /// Observe `token` instead of a private one.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Run one pass per pattern and merge the reports.
    ///
    /// Stops at the first fatal error; per-entity failures are only recorded.
    pub async fn run<D>(&self, directory: &mut D, patterns: &[String]) -> ConnectorResult<SyncReport>
    where
        D: DirectoryClient + ?Sized,
    {
        let mut report = SyncReport::start(self.options.dry_run);
        for pattern in patterns {
            let pass = self.run_pass(directory, pattern).await?;
            report.merge(pass);
        }
        report.finish();
        Ok(report)
    }

    /// Reconcile every directory group matching `pattern`.
    pub async fn run_pass<D>(&self, directory: &mut D, pattern: &str) -> ConnectorResult<SyncReport>
    where
        D: DirectoryClient + ?Sized,
    {
        let mut report = SyncReport::start(self.options.dry_run);
        let mut plan = MembershipPlan::new();

        let groups = directory.resolve_groups(pattern).await?;
        if groups.is_empty() {
            warn!(pattern = %pattern, "No directory groups matched pattern");
        }

        let mut outcome = Ok(());
        for group in &groups {
            if let Err(e) = self.ensure_not_cancelled("sync group") {
                outcome = Err(e);
                break;
            }
            info!("Syncing group: {}", group.name);
            report.groups_examined += 1;
            if let Err(e) = self.sync_group(directory, group, &mut plan, &mut report).await {
                outcome = Err(e);
                break;
            }
        }

        // Groups and users already created keep the memberships scheduled
        // for them, even when a later group aborts the pass.
        if let Err(e) = outcome {
            if !matches!(e, ConnectorError::Cancelled { .. }) && !plan.is_empty() {
                warn!(
                    error = %e,
                    memberships = plan.len(),
                    "Pass aborted, applying memberships scheduled so far"
                );
                self.flush_memberships(plan, &mut report).await?;
            } else {
                abandon_memberships(plan.into_attachments());
            }
            return Err(e);
        }

        self.flush_memberships(plan, &mut report).await?;

        report.finish();
        info!(
            pattern = %pattern,
            groups = report.groups_examined,
            groups_created = report.groups_created,
            users_created = report.users_created,
            memberships_added = report.memberships_added,
            failures = report.failures.len(),
            "Pass complete"
        );
        Ok(report)
    }

    async fn sync_group<D>(
        &self,
        directory: &mut D,
        group: &DirectoryGroup,
        plan: &mut MembershipPlan,
        report: &mut SyncReport,
    ) -> ConnectorResult<()>
    where
        D: DirectoryClient + ?Sized,
    {
        let Some(target_group) = self.ensure_group(&group.name, report).await else {
            return Ok(());
        };

        let members = match directory.resolve_group_members(group).await {
            Ok(members) => members,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(group = %group.name, error = %e, "Failed to resolve group members");
                report.record_failure(&group.name, "resolve_group_members", &e);
                return Ok(());
            }
        };
        debug!(group = %group.name, members = members.len(), "Resolved directory members");

        let users = self.ensure_users(&group.name, members, plan, report).await?;
        self.schedule_memberships(&target_group, &users, plan).await;
        Ok(())
    }

    /// Step 1. Returns the group as visible in the target, or `None` when
    /// the rest of the group's steps must be skipped.
    async fn ensure_group(&self, name: &str, report: &mut SyncReport) -> Option<TargetGroup> {
        let deadline = self.options.call_timeout;
        let groups = groups_or_empty(self.target.as_ref(), deadline).await;
        if let Some(existing) = find_group(&groups, name) {
            return Some(existing.clone());
        }

        if self.options.dry_run {
            info!("Would create group {}", name);
            report.groups_created += 1;
            return Some(TargetGroup {
                name: name.to_string(),
                ..Default::default()
            });
        }

        info!("Creating group {}", name);
        match with_deadline(deadline, "create_group", self.target.create_group(name)).await {
            Ok(created) => {
                debug!(group = %name, key = %created.key, "Group created");
                report.groups_created += 1;
            }
            Err(e) => {
                error!(group = %name, error = %e, "Failed to create group");
                report.record_failure(name, "create_group", &e);
                return None;
            }
        }

        let refreshed = groups_or_empty(self.target.as_ref(), deadline).await;
        match find_group(&refreshed, name) {
            Some(group) => Some(group.clone()),
            None => {
                let e = ConnectorError::GroupNotFound {
                    identifier: name.to_string(),
                };
                warn!(group = %name, "Created group is not visible after refresh");
                report.record_failure(name, "list_groups", &e);
                None
            }
        }
    }

    /// Step 2. Returns the target users that exist (or now exist) for the
    /// directory members, in directory order.
    async fn ensure_users(
        &self,
        group_name: &str,
        members: Vec<DirectoryUser>,
        plan: &mut MembershipPlan,
        report: &mut SyncReport,
    ) -> ConnectorResult<Vec<TargetUser>> {
        let existing = users_or_empty(self.target.as_ref(), self.options.call_timeout).await;

        let mut seen = HashSet::new();
        let mut present = Vec::new();
        let mut missing = Vec::new();
        for member in members {
            if !seen.insert(member.login_key()) {
                continue;
            }
            match find_user(&existing, &member.login_name) {
                Some(user) => present.push(user.clone()),
                None => missing.push(member),
            }
        }

        if missing.is_empty() {
            return Ok(present);
        }

        if self.options.dry_run {
            for member in missing {
                if plan.plan_user_create(&member.login_name) {
                    info!("Would create user {}", member.login_name);
                    report.users_created += 1;
                }
                present.push(TargetUser {
                    username: member.login_name,
                    display_name: Some(member.display_name).filter(|n| !n.is_empty()),
                    email: member.mail,
                    ..Default::default()
                });
            }
            return Ok(present);
        }

        let created = self.create_users(group_name, missing, report).await?;
        present.extend(created);
        Ok(present)
    }

    /// Fan out user creates and join them all before returning.
    ///
    /// Failed creates are recorded and dropped. Cancellation aborts every
    /// outstanding create.
    async fn create_users(
        &self,
        group_name: &str,
        missing: Vec<DirectoryUser>,
        report: &mut SyncReport,
    ) -> ConnectorResult<Vec<TargetUser>> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_creates));
        let mut join_set = JoinSet::new();

        for user in missing {
            info!("Creating user {}", user.login_name);
            let target = Arc::clone(&self.target);
            let semaphore = Arc::clone(&semaphore);
            let deadline = self.options.call_timeout;
            join_set.spawn(async move {
                let result = create_with_permit(target.as_ref(), &semaphore, &user, deadline).await;
                (user, result)
            });
        }

        let mut created = Vec::new();
        loop {
            let joined = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    join_set.abort_all();
                    warn!(group = %group_name, "Cancelled while creating users");
                    return Err(ConnectorError::Cancelled {
                        operation: format!("create users for group {group_name}"),
                    });
                }
                joined = join_set.join_next() => joined,
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok((_, Ok(user))) => {
                    report.users_created += 1;
                    created.push(user);
                }
                Ok((user, Err(e))) => {
                    error!(user = %user.login_name, error = %e, "Failed to create user");
                    report.record_failure(&user.login_name, "create_user", &e);
                }
                Err(e) => {
                    error!(group = %group_name, error = %e, "User create task failed");
                    report.record_failure(
                        group_name,
                        "create_user",
                        &ConnectorError::target_unavailable(format!("create task failed: {e}")),
                    );
                }
            }
        }

        Ok(created)
    }

    /// Step 3.
    async fn schedule_memberships(
        &self,
        group: &TargetGroup,
        users: &[TargetUser],
        plan: &mut MembershipPlan,
    ) {
        let current = if group.key.is_empty() && group.href.is_none() {
            Vec::new()
        } else {
            group_members_or_empty(self.target.as_ref(), group, self.options.call_timeout).await
        };

        for user in users {
            if current.iter().any(|m| m.matches_login(&user.username)) {
                continue;
            }
            if plan.schedule(user, group) {
                debug!(user = %user.username, group = %group.name, "Scheduled membership");
            }
        }
    }

    /// One read-modify-write per user, strictly sequential.
    async fn flush_memberships(
        &self,
        plan: MembershipPlan,
        report: &mut SyncReport,
    ) -> ConnectorResult<()> {
        if plan.is_empty() {
            return Ok(());
        }
        debug!(
            users = plan.user_count(),
            memberships = plan.len(),
            "Flushing membership plan"
        );

        let mut attachments = plan.into_attachments();
        while let Some(pending) = attachments.next() {
            if self.options.dry_run {
                for group in &pending.groups {
                    info!("Would add user {} to group {}", pending.user.username, group.name);
                }
                report.memberships_added += pending.groups.len();
                continue;
            }

            if let Err(e) = self.ensure_not_cancelled("add memberships") {
                abandon_memberships(std::iter::once(pending).chain(attachments));
                return Err(e);
            }

            let username = &pending.user.username;
            for group in &pending.groups {
                info!("Adding user {} to group {}", username, group.name);
            }

            let call = self.target.add_user_to_groups(&pending.user, &pending.groups);
            match with_deadline(self.options.call_timeout, "add_user_to_groups", call).await {
                Ok(added) => {
                    if added < pending.groups.len() {
                        debug!(
                            user = %username,
                            already_member = pending.groups.len() - added,
                            "Some memberships already present"
                        );
                    }
                    report.memberships_added += added;
                }
                Err(e) => {
                    error!(user = %username, error = %e, "Failed to add user to groups");
                    report.record_failure(username.as_str(), "add_user_to_groups", &e);
                }
            }
        }
        Ok(())
    }

    fn ensure_not_cancelled(&self, operation: &str) -> ConnectorResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ConnectorError::Cancelled {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

/// Log every scheduled membership that will not be applied.
fn abandon_memberships(attachments: impl IntoIterator<Item = PendingAttachment>) {
    for pending in attachments {
        for group in &pending.groups {
            warn!(
                user = %pending.user.username,
                group = %group.name,
                "Membership not applied, run cancelled"
            );
        }
    }
}

async fn create_with_permit<T>(
    target: &T,
    semaphore: &Semaphore,
    user: &DirectoryUser,
    deadline: Duration,
) -> ConnectorResult<TargetUser>
where
    T: TargetClient + ?Sized,
{
    let _permit = semaphore
        .acquire()
        .await
        .map_err(|_| ConnectorError::Cancelled {
            operation: format!("create user {}", user.login_name),
        })?;
    with_deadline(deadline, "create_user", target.create_user(user)).await
}
