//! Access layer configuration.

use svcplane_core::store::DEFAULT_PATCH_ATTEMPTS;

#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Namespace holding brokers, offerings and plans.
    pub control_plane_namespace: String,
    /// Optimistic write attempts before giving up (default: 5).
    pub max_patch_attempts: u32,
    /// Namespaces queried at once by the lister (default: 8).
    pub max_concurrent_namespace_queries: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            control_plane_namespace: "cf".into(),
            max_patch_attempts: DEFAULT_PATCH_ATTEMPTS,
            max_concurrent_namespace_queries: 8,
        }
    }
}
