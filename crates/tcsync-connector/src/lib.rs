//! # tcsync connector framework
//!
//! Shared abstractions for reconciling directory groups into a CI server.
//!
//! - [`DirectoryClient`] - read-only access to the directory (LDAP/AD)
//! - [`TargetClient`] - inventory reads and additive mutations on the target
//! - [`ConnectorError`] - error taxonomy with fatal/per-entity classification
//!
//! The concrete clients live in `tcsync-connector-ldap` and
//! `tcsync-connector-teamcity`; the engine that drives them lives in
//! `tcsync-reconcile`.

pub mod error;
pub mod key;
pub mod traits;
pub mod types;

pub use error::{ConnectorError, ConnectorResult};
pub use key::generate_group_key;
pub use traits::{DirectoryClient, TargetClient};
pub use types::{
    find_group, find_user, DirectoryGroup, DirectoryUser, TargetGroup, TargetUser,
};
