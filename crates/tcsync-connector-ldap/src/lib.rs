//! # LDAP directory client
//!
//! Reads groups and their transitive person members from an LDAP directory
//! (Active Directory schema) for tcsync.
//!
//! ## Example
//!
//! ```ignore
//! use tcsync_connector::DirectoryClient;
//! use tcsync_connector_ldap::{LdapConfig, LdapDirectory};
//!
//! let config = LdapConfig::new("ad.corp.example.com", "dc=corp,dc=example,dc=com", "svc@corp.example.com")
//!     .with_password("secret");
//!
//! let mut directory = LdapDirectory::connect(config).await?;
//! let groups = directory.resolve_groups("R.Teamcity.*").await?;
//! ```

pub mod config;
pub mod directory;
pub mod filter;

// Re-exports
pub use config::{base_dn_from_domain, LdapConfig};
pub use directory::LdapDirectory;
