//! # tcsync reconciliation
//!
//! Additive, idempotent reconciliation of directory groups into a TeamCity
//! style target: missing groups, users and memberships are created, nothing
//! is ever removed.
//!
//! ```ignore
//! let reconciler = Reconciler::new(Arc::new(target), ReconcileOptions::default())?
//!     .with_cancellation(token);
//! let report = reconciler.run(&mut directory, &patterns).await?;
//! ```

pub mod engine;
pub mod inventory;
pub mod membership;
pub mod options;
pub mod report;

pub use engine::Reconciler;
pub use membership::{MembershipPlan, PendingAttachment};
pub use options::ReconcileOptions;
pub use report::{SyncFailure, SyncReport};
