//! Route policy: the canonical-path normalizer and the static policy table it feeds.

pub mod normalize;
pub mod table;

pub use normalize::{NormalizedPath, Placeholder, normalize_path};
pub use table::{PolicyEntry, PolicyKey, PolicyTable, ResourceKind};

use axum::http::Method;

/// Canonical lookup key for a concrete request, plus the segment the placeholder replaced.
pub fn policy_key_for(method: &Method, path: &str) -> (PolicyKey, Option<String>) {
    let NormalizedPath {
        canonical,
        resource_id,
        ..
    } = normalize_path(path);
    (PolicyKey::new(method.clone(), canonical), resource_id)
}
