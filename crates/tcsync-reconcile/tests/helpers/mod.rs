//! Shared fakes for the reconciler integration tests.

#![allow(dead_code)]

pub mod fake_directory;
pub mod fake_target;
