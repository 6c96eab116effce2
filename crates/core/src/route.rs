//! Request classification.
//!
//! Every request maps to exactly one [`RouteClass`]. Checks run in a fixed
//! order and the first match wins:
//!
//! 1. immutable build asset prefix → `ImmutableAsset`
//! 2. same-origin and (navigation mode, or an extensionless path outside the
//!    known non-HTML prefixes) → `Navigation`
//! 3. API prefix → `DirectoryQuery` for the one configured endpoint, else
//!    `GenericApi`
//! 4. data or content prefix → `ContentSnapshot`
//! 5. anything else → `Other`
//!
//! An immutable asset requested in navigation mode is still an
//! `ImmutableAsset`.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::RouteConfig;
use crate::request::Request;

/// Classification of a request by URL shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Content-hashed per build. Never intercepted.
    ImmutableAsset,
    /// An HTML page.
    Navigation,
    /// The single cache-first API endpoint.
    DirectoryQuery,
    /// Any other API read.
    GenericApi,
    /// Static JSON/content bundles.
    ContentSnapshot,
    /// Images, fonts and everything else.
    Other,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::ImmutableAsset => "immutable_asset",
            RouteClass::Navigation => "navigation",
            RouteClass::DirectoryQuery => "directory_query",
            RouteClass::GenericApi => "generic_api",
            RouteClass::ContentSnapshot => "content_snapshot",
            RouteClass::Other => "other",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure, total classifier over request URL shape.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    origin: Url,
    routes: RouteConfig,
    directory_path: String,
    directory_query: Option<String>,
}

impl RouteClassifier {
    pub fn new(origin: Url, routes: RouteConfig) -> Self {
        let (directory_path, directory_query) = match routes.directory_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (routes.directory_query.clone(), None),
        };
        Self { origin, routes, directory_path, directory_query }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Absolute URL of the directory-query endpoint on this origin.
    pub fn directory_url(&self) -> Result<Url, url::ParseError> {
        self.origin.join(&self.routes.directory_query)
    }

    pub fn classify(&self, request: &Request) -> RouteClass {
        let url = request.url();
        let path = url.path();
        let routes = &self.routes;

        if path.starts_with(&routes.immutable_prefix) {
            return RouteClass::ImmutableAsset;
        }

        if self.is_same_origin(url)
            && (request.is_navigation() || (!has_file_extension(path) && !self.is_non_html(path)))
        {
            return RouteClass::Navigation;
        }

        if path.starts_with(&routes.api_prefix) {
            if self.is_directory_query(url) {
                return RouteClass::DirectoryQuery;
            }
            return RouteClass::GenericApi;
        }

        if path.starts_with(&routes.data_prefix) || path.starts_with(&routes.content_prefix) {
            return RouteClass::ContentSnapshot;
        }

        RouteClass::Other
    }

    fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    fn is_non_html(&self, path: &str) -> bool {
        let routes = &self.routes;
        [&routes.api_prefix, &routes.data_prefix, &routes.content_prefix, &routes.build_prefix, &routes.icons_prefix]
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn is_directory_query(&self, url: &Url) -> bool {
        if url.path() != self.directory_path {
            return false;
        }
        match &self.directory_query {
            Some(query) => url.query() == Some(query.as_str()),
            None => true,
        }
    }
}

/// Whether the last path segment looks like `name.ext`.
fn has_file_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or("");
    match segment.rfind('.') {
        Some(idx) => idx > 0 && idx + 1 < segment.len(),
        None => false,
    }
}
