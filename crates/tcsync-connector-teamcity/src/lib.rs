//! # TeamCity target client
//!
//! Implements [`tcsync_connector::TargetClient`] against the TeamCity REST
//! API using HTTP basic authentication and JSON bodies.
//!
//! Endpoints used:
//!
//! | Operation | Request |
//! |---|---|
//! | list groups | `GET /app/rest/userGroups` |
//! | list users | `GET /app/rest/users` |
//! | group members | `GET <group.href>` |
//! | user groups | `GET /app/rest/users/<username>/groups` |
//! | create group | `POST /app/rest/userGroups` |
//! | create user | `POST /app/rest/users` |
//! | replace user groups | `PUT /app/rest/users/<username>/groups` |

pub mod client;
pub mod config;
pub mod models;

pub use client::TeamCityClient;
pub use config::TeamCityConfig;
