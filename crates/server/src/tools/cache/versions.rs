//! cache_versions tool implementation.
//!
//! Lists the cache versions present on the device along with the current
//! version and its lifecycle state.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_client::LifecycleController;
use waystation_core::CacheDb;

use crate::tools::json_result;

/// Parameters for the cache_versions tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheVersionsParams {
    /// Include per-version entry counts (default: true).
    #[serde(default = "default_true")]
    pub include_counts: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VersionEntry {
    pub name: String,
    pub current: bool,
    /// Recorded as controlling clients. Absent without counts.
    pub active: Option<bool>,
    pub created_at: Option<String>,
    pub entries: Option<u64>,
}

/// Output from the cache_versions tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheVersionsOutput {
    pub current: String,
    pub state: String,
    pub versions: Vec<VersionEntry>,
}

/// Implementation of the cache_versions tool.
pub async fn versions_impl(
    db: &CacheDb, lifecycle: &LifecycleController, params: CacheVersionsParams,
) -> Result<CallToolResult, McpError> {
    let current = lifecycle.version();

    let versions = if params.include_counts {
        db.version_stats()
            .await?
            .into_iter()
            .map(|stats| VersionEntry {
                current: stats.version == *current,
                active: Some(stats.active),
                name: stats.version.to_string(),
                created_at: Some(stats.created_at),
                entries: Some(stats.entries),
            })
            .collect()
    } else {
        db.list_versions()
            .await?
            .into_iter()
            .map(|version| VersionEntry {
                current: version == *current,
                active: None,
                name: version.to_string(),
                created_at: None,
                entries: None,
            })
            .collect()
    };

    let output = CacheVersionsOutput { current: current.to_string(), state: lifecycle.state().to_string(), versions };
    json_result(&output)
}
