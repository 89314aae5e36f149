//! Per-run accounting of what a pass did and what failed.

use chrono::{DateTime, Utc};
use tcsync_connector::ConnectorError;

/// A per-entity failure recorded during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    /// Group name or user login the failure is about.
    pub entity: String,
    /// The call that failed, e.g. `create_user`.
    pub operation: String,
    /// Stable classification from [`ConnectorError::error_code`].
    pub error_code: String,
    pub message: String,
}

/// Summary statistics from a reconciliation run.
///
/// In dry-run mode the counters hold what would have been done.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    /// Directory groups matched by the pattern(s).
    pub groups_examined: usize,
    pub groups_created: usize,
    pub users_created: usize,
    pub memberships_added: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Start a report timestamped now.
    pub fn start(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            groups_examined: 0,
            groups_created: 0,
            users_created: 0,
            memberships_added: 0,
            failures: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn record_failure(
        &mut self,
        entity: impl Into<String>,
        operation: impl Into<String>,
        error: &ConnectorError,
    ) {
        self.failures.push(SyncFailure {
            entity: entity.into(),
            operation: operation.into(),
            error_code: error.error_code().to_string(),
            message: error.to_string(),
        });
    }

    /// Fold another pass into this one. The merged window spans both.
    pub fn merge(&mut self, other: SyncReport) {
        self.started_at = self.started_at.min(other.started_at);
        self.finished_at = match (self.finished_at, other.finished_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.dry_run |= other.dry_run;
        self.groups_examined += other.groups_examined;
        self.groups_created += other.groups_created;
        self.users_created += other.users_created;
        self.memberships_added += other.memberships_added;
        self.failures.extend(other.failures);
    }

    /// No per-entity failure was recorded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total mutating calls the pass issued (or would issue).
    pub fn total_changes(&self) -> usize {
        self.groups_created + self.users_created + self.memberships_added
    }

    /// Wall-clock duration, if the report is finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_uses_error_code() {
        let mut report = SyncReport::start(false);
        report.record_failure(
            "alice",
            "create_user",
            &ConnectorError::TargetRejected {
                endpoint: "/app/rest/users".to_string(),
                status: 500,
                body: "boom".to_string(),
            },
        );

        assert!(!report.is_clean());
        assert_eq!(report.failures[0].entity, "alice");
        assert_eq!(report.failures[0].error_code, "TARGET_REJECTED");
        assert!(report.failures[0].message.contains("HTTP 500"));
    }

    #[test]
    fn test_merge_sums_counters() {
        let mut first = SyncReport::start(false);
        first.groups_examined = 1;
        first.users_created = 2;
        first.finish();

        let mut second = SyncReport::start(false);
        second.groups_examined = 2;
        second.memberships_added = 3;
        second.record_failure(
            "Eng",
            "create_group",
            &ConnectorError::target_unavailable("reset"),
        );
        second.finish();
        let second_end = second.finished_at;

        first.merge(second);

        assert_eq!(first.groups_examined, 3);
        assert_eq!(first.total_changes(), 5);
        assert_eq!(first.failures.len(), 1);
        assert_eq!(first.finished_at, second_end);
        assert!(first.duration().is_some());
    }
}
