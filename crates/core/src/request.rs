//! Typed request descriptors.
//!
//! A [`RequestDescriptor`] is the cache identity of a request: the
//! upper-cased method and the absolute URL with its fragment removed.
//! Headers never participate in identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// The `(method, absolute URL)` identity used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestDescriptor {
    method: String,
    url: Url,
}

impl RequestDescriptor {
    /// Build a descriptor, normalizing the method to upper case and
    /// dropping any URL fragment.
    pub fn new(method: &str, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url }
    }

    /// Shorthand for a GET descriptor.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Only GET descriptors are ever read from or written to the cache.
    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// How the request was issued by the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// A top-level page navigation.
    Navigate,
    /// Any other fetch (scripts, images, API reads, ...).
    #[default]
    Subresource,
}

/// An outgoing request offered to the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub descriptor: RequestDescriptor,
    pub mode: RequestMode,
    /// Headers forwarded to the network. Not part of the cache key.
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn new(method: &str, url: Url) -> Self {
        Self { descriptor: RequestDescriptor::new(method, url), mode: RequestMode::Subresource, headers: Vec::new() }
    }

    /// A subresource GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// A GET request issued in navigation mode.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &Url {
        self.descriptor.url()
    }

    pub fn method(&self) -> &str {
        self.descriptor.method()
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}
