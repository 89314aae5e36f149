//! In-memory TeamCity stand-in that records every call.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tcsync_connector::{
    ConnectorError, ConnectorResult, DirectoryUser, TargetClient, TargetGroup, TargetUser,
};

#[derive(Default)]
struct State {
    groups: Vec<TargetGroup>,
    users: Vec<TargetUser>,
    calls: Vec<String>,
    next_key: usize,
}

#[derive(Default)]
pub struct FakeTarget {
    state: Mutex<State>,
    /// Lower-cased logins whose create answers HTTP 500.
    reject_users: HashSet<String>,
    /// Created groups never show up in listings.
    hide_created_groups: bool,
    /// `list_group_members` fails with a transport error.
    fail_member_listing: bool,
    fail_group_listing: bool,
    fail_user_listing: bool,
    /// Delay applied to every user create.
    create_delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, username: &str) -> Self {
        self.lock().users.push(user(username));
        self
    }

    /// Existing group with the given member usernames (which must also be users).
    pub fn with_group(self, name: &str, members: &[&str]) -> Self {
        {
            let mut state = self.lock();
            let key = format!("EXISTING{}", state.groups.len());
            let group = TargetGroup {
                href: Some(format!("/app/rest/userGroups/key:{key}")),
                key,
                name: name.to_string(),
                members: members.iter().map(|m| user(m)).collect(),
            };
            state.groups.push(group);
        }
        self
    }

    pub fn rejecting_user(mut self, login: &str) -> Self {
        self.reject_users.insert(login.to_lowercase());
        self
    }

    pub fn hiding_created_groups(mut self) -> Self {
        self.hide_created_groups = true;
        self
    }

    pub fn failing_member_listing(mut self) -> Self {
        self.fail_member_listing = true;
        self
    }

    pub fn failing_group_listing(mut self) -> Self {
        self.fail_group_listing = true;
        self
    }

    pub fn failing_user_listing(mut self) -> Self {
        self.fail_user_listing = true;
        self
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    /// Every call in order, as `operation` or `operation:subject`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Operation names only, in order.
    pub fn operations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|c| c.split(':').next().unwrap_or_default().to_string())
            .collect()
    }

    /// Calls that change target state.
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("create_") || c.starts_with("replace_"))
            .collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.operations().iter().filter(|o| *o == operation).count()
    }

    pub fn group_names(&self) -> Vec<String> {
        self.lock().groups.iter().map(|g| g.name.clone()).collect()
    }

    pub fn usernames(&self) -> Vec<String> {
        self.lock().users.iter().map(|u| u.username.clone()).collect()
    }

    /// Member usernames of the group called `name`.
    pub fn members_of(&self, name: &str) -> Vec<String> {
        self.lock()
            .groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.members.iter().map(|m| m.username.clone()).collect())
            .unwrap_or_default()
    }
}

fn user(username: &str) -> TargetUser {
    TargetUser {
        username: username.to_string(),
        href: Some(format!("/app/rest/users/username:{username}")),
        ..Default::default()
    }
}

fn without_members(group: &TargetGroup) -> TargetGroup {
    TargetGroup {
        members: Vec::new(),
        ..group.clone()
    }
}

#[async_trait]
impl TargetClient for FakeTarget {
    async fn list_groups(&self) -> ConnectorResult<Vec<TargetGroup>> {
        self.record("list_groups".to_string());
        if self.fail_group_listing {
            return Err(ConnectorError::target_unavailable("connection reset"));
        }
        let state = self.lock();
        Ok(state
            .groups
            .iter()
            .filter(|g| !(self.hide_created_groups && g.key.starts_with("NEW")))
            .map(without_members)
            .collect())
    }

    async fn list_users(&self) -> ConnectorResult<Vec<TargetUser>> {
        self.record("list_users".to_string());
        if self.fail_user_listing {
            return Err(ConnectorError::target_unavailable("connection reset"));
        }
        Ok(self.lock().users.clone())
    }

    async fn list_group_members(&self, group: &TargetGroup) -> ConnectorResult<Vec<TargetUser>> {
        self.record(format!("list_group_members:{}", group.name));
        if self.fail_member_listing {
            return Err(ConnectorError::target_unavailable("connection reset"));
        }
        Ok(self
            .lock()
            .groups
            .iter()
            .find(|g| g.same_group(group))
            .map(|g| g.members.clone())
            .unwrap_or_default())
    }

    async fn list_user_groups(&self, target_user: &TargetUser) -> ConnectorResult<Vec<TargetGroup>> {
        self.record(format!("list_user_groups:{}", target_user.username));
        Ok(self
            .lock()
            .groups
            .iter()
            .filter(|g| g.has_member(&target_user.username))
            .map(without_members)
            .collect())
    }

    async fn create_group(&self, name: &str) -> ConnectorResult<TargetGroup> {
        self.record(format!("create_group:{name}"));
        let mut state = self.lock();
        if state.groups.iter().any(|g| g.name == name) {
            return Err(ConnectorError::CreateConflict {
                identifier: name.to_string(),
                body: "Group with the same name already exists".to_string(),
            });
        }
        state.next_key += 1;
        let key = format!("NEW{:013}", state.next_key);
        state.groups.push(TargetGroup {
            href: Some(format!("/app/rest/userGroups/key:{key}")),
            key: key.clone(),
            name: name.to_string(),
            members: Vec::new(),
        });
        Ok(TargetGroup {
            key,
            name: name.to_string(),
            href: None,
            members: Vec::new(),
        })
    }

    async fn create_user(&self, directory_user: &DirectoryUser) -> ConnectorResult<TargetUser> {
        self.record(format!("create_user:{}", directory_user.login_name));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.reject_users.contains(&directory_user.login_key()) {
            return Err(ConnectorError::TargetRejected {
                endpoint: "/app/rest/users".to_string(),
                status: 500,
                body: "Internal Server Error".to_string(),
            });
        }

        let mut state = self.lock();
        if state
            .users
            .iter()
            .any(|u| u.matches_login(&directory_user.login_name))
        {
            return Err(ConnectorError::CreateConflict {
                identifier: directory_user.login_name.clone(),
                body: "Duplicate user".to_string(),
            });
        }
        let created = user(&directory_user.login_name);
        state.users.push(created.clone());
        Ok(created)
    }

    async fn replace_user_groups(
        &self,
        target_user: &TargetUser,
        groups: &[TargetGroup],
    ) -> ConnectorResult<()> {
        self.record(format!("replace_user_groups:{}", target_user.username));
        let mut state = self.lock();
        for group in state.groups.iter_mut() {
            let wanted = groups.iter().any(|g| g.same_group(group));
            let present = group.has_member(&target_user.username);
            if wanted && !present {
                group.members.push(target_user.clone());
            } else if !wanted && present {
                group
                    .members
                    .retain(|m| !m.matches_login(&target_user.username));
            }
        }
        Ok(())
    }
}
