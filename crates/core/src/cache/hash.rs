//! Cache key generation.

use sha2::{Digest, Sha256};

use crate::request::RequestDescriptor;

/// Compute the row key for a request descriptor.
///
/// Only the method and the fragment-free URL participate, so two requests
/// that differ only in headers share an entry.
pub fn compute_cache_key(descriptor: &RequestDescriptor) -> String {
    let mut hasher = Sha256::new();
    hasher.update(descriptor.method().as_bytes());
    hasher.update(b"\n");
    hasher.update(descriptor.url().as_str().as_bytes());
    hex::encode(hasher.finalize())
}
