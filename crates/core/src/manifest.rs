//! Build-time list of resources precached at Install.

use url::Url;

use crate::Error;

/// Paths that must be present in the cache after Install.
///
/// Entries are resolved one at a time against the origin, so a malformed
/// entry fails on its own without affecting the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticManifest {
    origin: Url,
    entries: Vec<String>,
}

impl StaticManifest {
    pub fn new(origin: Url, entries: Vec<String>) -> Self {
        Self { origin, entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Each entry paired with its absolute URL, or the resolution error.
    pub fn resolve(&self) -> impl Iterator<Item = (&str, Result<Url, Error>)> + '_ {
        self.entries.iter().map(move |entry| {
            let resolved = self
                .origin
                .join(entry.trim())
                .map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")));
            (entry.as_str(), resolved)
        })
    }
}
