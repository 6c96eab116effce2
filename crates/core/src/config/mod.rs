//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WAYSTATION_*)
//! 2. TOML config file (if WAYSTATION_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WAYSTATION_*)
/// 2. TOML config file (if WAYSTATION_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the application is served from. Relative manifest paths are
    /// resolved against it and same-origin checks compare against it.
    ///
    /// Set via WAYSTATION_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the current on-device cache version.
    ///
    /// Changing it is what triggers a fresh Install and the garbage
    /// collection of the previous version at Activate.
    ///
    /// Set via WAYSTATION_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Path to SQLite cache database.
    ///
    /// Set via WAYSTATION_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via WAYSTATION_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via WAYSTATION_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds. A timed-out fetch takes the
    /// strategy's cache fallback path.
    ///
    /// Set via WAYSTATION_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Paths precached at Install.
    ///
    /// Set via WAYSTATION_STATIC_MANIFEST environment variable as an array,
    /// e.g. `["/manifest.webmanifest","/icons/icon-192.png"]`.
    #[serde(default = "default_static_manifest")]
    pub static_manifest: Vec<String>,

    /// URL-shape rules used by the route classifier.
    #[serde(default)]
    pub routes: RouteConfig,
}

/// Path prefixes and endpoints that drive route classification.
///
/// Nested keys are set with a double underscore, e.g.
/// `WAYSTATION_ROUTES__API_PREFIX=/v2/api/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Content-hashed build assets. Never intercepted.
    pub immutable_prefix: String,
    /// Everything the build pipeline emits; never an HTML page.
    pub build_prefix: String,
    pub api_prefix: String,
    pub data_prefix: String,
    pub content_prefix: String,
    pub icons_prefix: String,
    /// The one API endpoint served cache-first. Path, optionally with a query.
    pub directory_query: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            immutable_prefix: "/_next/static/".into(),
            build_prefix: "/_next/".into(),
            api_prefix: "/api/".into(),
            data_prefix: "/data/".into(),
            content_prefix: "/content/".into(),
            icons_prefix: "/icons/".into(),
            directory_query: "/api/directory?view=all".into(),
        }
    }
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_cache_version() -> String {
    "custody-clarity-v4".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./waystation-cache.sqlite")
}

fn default_user_agent() -> String {
    "waystation/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_static_manifest() -> Vec<String> {
    vec![
        "/manifest.webmanifest".into(),
        "/icons/icon-192.png".into(),
        "/icons/icon-512.png".into(),
        "/api/states".into(),
        "/api/glossary?lang=en".into(),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_version: default_cache_version(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            static_manifest: default_static_manifest(),
            routes: RouteConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// The configured origin as a parsed URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute
    /// http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WAYSTATION_`
    /// 2. TOML file from `WAYSTATION_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WAYSTATION_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WAYSTATION_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
