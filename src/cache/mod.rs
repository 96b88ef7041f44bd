//! Best-effort local cache for resolved media URLs.
//!
//! This module provides:
//! - A small key/value store abstraction with SQLite and no-op backends
//! - A TTL cache (`MediaCache`) on top of it, keyed by post id
//! - Corruption and quota recovery via sweeps of the cache's key namespace

mod media;
mod storage;
mod traits;

pub use media::MediaCache;
pub use storage::{NoopStore, SqliteStore};
pub use traits::{Clock, KeyValueStore, SystemClock, UrlSource};

#[cfg(test)]
pub use storage::testing::MemoryStore;
#[cfg(test)]
pub use traits::testing::ManualClock;
