//! cache_keys tool implementation.
//!
//! Lists the request descriptors stored in one cache version.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_core::{CacheDb, CacheStore, CacheVersion, Error};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Version to list (default: the current version).
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeyEntry {
    pub method: String,
    pub url: String,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub version: String,
    pub count: usize,
    /// Oldest first.
    pub keys: Vec<KeyEntry>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(db: &CacheDb, current: &CacheVersion, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let version = params.version.map(CacheVersion::new).unwrap_or_else(|| current.clone());

    if !db.versions().await?.contains(&version) {
        return Err(Error::CacheMiss(format!("no cache version named {version}")).into());
    }

    let keys: Vec<KeyEntry> = db
        .keys(&version)
        .await?
        .into_iter()
        .map(|key| KeyEntry { method: key.method().to_string(), url: key.url().to_string() })
        .collect();

    let output = CacheKeysOutput { version: version.to_string(), count: keys.len(), keys };
    json_result(&output)
}
