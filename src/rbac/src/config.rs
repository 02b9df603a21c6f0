//! Engine configuration

use std::time::Duration;

use serde::Deserialize;

/// Default lifetime of the role cache (5 minutes)
pub const DEFAULT_ROLE_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Seconds a loaded role snapshot is served before reloading
    pub role_cache_ttl_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            role_cache_ttl_secs: DEFAULT_ROLE_CACHE_TTL_SECS,
        }
    }
}

impl ManagerConfig {
    pub fn role_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.role_cache_ttl_secs)
    }
}
