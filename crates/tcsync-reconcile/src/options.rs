//! Run options for the reconciler.

use std::time::Duration;

use tcsync_connector::{ConnectorError, ConnectorResult};

/// Default width of the user-create fan-out.
pub const DEFAULT_MAX_CONCURRENT_CREATES: usize = 8;

/// Default deadline applied to every target call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Knobs controlling a reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Compute and log the diff without issuing mutating calls.
    pub dry_run: bool,
    /// Upper bound on user creates in flight at once.
    pub max_concurrent_creates: usize,
    /// Deadline for each individual target call.
    pub call_timeout: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_concurrent_creates: DEFAULT_MAX_CONCURRENT_CREATES,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl ReconcileOptions {
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_creates(mut self, max: usize) -> Self {
        self.max_concurrent_creates = max;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn validate(&self) -> ConnectorResult<()> {
        if self.max_concurrent_creates == 0 {
            return Err(ConnectorError::invalid_configuration(
                "max_concurrent_creates must be at least 1",
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(ConnectorError::invalid_configuration(
                "call_timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}
