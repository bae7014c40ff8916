//! ps-cache: Descriptor cache
//!
//! Two logical entries live in the cache:
//! - [`CacheKey::All`]: every descriptor that passed the allow-list
//! - [`CacheKey::Available`]: the ranked, deduplicated list being served
//!
//! Entries are replaced wholesale. Readers get an `Arc` snapshot of the
//! list as it was at the last `set`, never a partially written one.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ps_core::Descriptor;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub use memory::{CacheStats, MemoryCache};

/// The two recognized cache entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKey {
    /// All known descriptors
    All,
    /// Currently available descriptors
    Available,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Available => "available",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyed store for descriptor lists
///
/// The scheduler and the read endpoint only depend on this contract.
#[async_trait]
pub trait DescriptorStore: Send + Sync {
    /// Current list for `key`, None if it was never set
    async fn get(&self, key: CacheKey) -> Option<Arc<Vec<Descriptor>>>;

    /// Replace the list for `key`
    async fn set(&self, key: CacheKey, descriptors: Vec<Descriptor>);

    /// When `key` was last replaced
    async fn updated_at(&self, _key: CacheKey) -> Option<DateTime<Utc>> {
        None
    }
}

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{CacheKey, CacheStats, DescriptorStore, MemoryCache};
}
