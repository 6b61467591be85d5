//! Persistent metadata cache
//!
//! Remembers remotely resolved metadata (release tag, last update date)
//! so repeated runs inside the freshness window stay offline.
//!
//! # Freshness
//!
//! | State | Condition | Resolver action |
//! |-------|-----------|-----------------|
//! | Missing | store or key absent | ask the remote, store the answer |
//! | Stale | key older than `cache.duration_secs` | ask the remote, fall back to cache on failure |
//! | Fresh | key within `cache.duration_secs` | use the cached value |

pub mod lock;
pub mod store;

pub use lock::RunLock;
pub use store::{CacheEntry, CacheStore, FileCacheStore};
