//! # Account Sync Configuration

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Default number of cached account values.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Account sync configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum number of cached `(key, value)` entries before LRU eviction.
    pub cache_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Create a config for testing (small cache).
    pub fn for_testing() -> Self {
        Self { cache_capacity: 8 }
    }

    /// Effective capacity; zero is clamped to one.
    pub fn capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
