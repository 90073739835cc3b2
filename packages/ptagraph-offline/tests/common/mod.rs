//! Common test utilities for ptagraph-offline
//!
//! Shared program-fact fixtures for integration and property tests.

mod fixtures;

pub use fixtures::*;
