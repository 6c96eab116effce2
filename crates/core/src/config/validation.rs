//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `origin` is not an http(s) URL
    /// - a route prefix or the directory query does not start with `/`
    /// - a manifest entry is blank
    ///
    /// Returns `ConfigError::Missing` if `cache_version` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_version".into(),
                hint: "Set WAYSTATION_CACHE_VERSION to the build's cache name".into(),
            });
        }

        self.origin_url()?;

        let routes = &self.routes;
        let prefixes = [
            ("routes.immutable_prefix", &routes.immutable_prefix),
            ("routes.build_prefix", &routes.build_prefix),
            ("routes.api_prefix", &routes.api_prefix),
            ("routes.data_prefix", &routes.data_prefix),
            ("routes.content_prefix", &routes.content_prefix),
            ("routes.icons_prefix", &routes.icons_prefix),
            ("routes.directory_query", &routes.directory_query),
        ];
        for (field, value) in prefixes {
            if !value.starts_with('/') {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must start with '/'".into() });
            }
        }

        if !routes.directory_query.starts_with(&routes.api_prefix) {
            tracing::warn!(
                directory_query = %routes.directory_query,
                api_prefix = %routes.api_prefix,
                "directory_query is outside api_prefix and will never be classified as a directory query"
            );
        }

        if self.static_manifest.iter().any(|entry| entry.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "static_manifest".into(),
                reason: "entries must not be blank".into(),
            });
        }

        Ok(())
    }
}
