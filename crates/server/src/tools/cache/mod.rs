//! Cache inspection MCP tools.
//!
//! This module provides read-only views of the on-device cache versions.

pub mod keys;
pub mod versions;

pub use keys::{CacheKeysParams, keys_impl};
pub use versions::{CacheVersionsParams, versions_impl};
