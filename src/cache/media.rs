//! TTL cache mapping post ids to resolved media URLs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::traits::{Clock, KeyValueStore, SystemClock};

/// Prefix for every key the cache owns in the shared store.
pub const CACHE_PREFIX: &str = "instagram_cache_";

/// How long a resolved URL stays live.
pub fn cache_ttl() -> Duration {
  Duration::hours(24)
}

/// Serialized form of a cache entry. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
  pub url: String,
  /// Write time
  pub timestamp: i64,
  /// `timestamp + TTL`
  pub expires: i64,
}

impl CacheEntry {
  fn new(url: &str, now: DateTime<Utc>) -> Self {
    let timestamp = now.timestamp_millis();
    Self {
      url: url.to_string(),
      timestamp,
      expires: timestamp + cache_ttl().num_milliseconds(),
    }
  }

  /// Parse a stored value. Anything that doesn't decode into a well-formed
  /// entry counts as corrupted.
  fn parse(raw: &str) -> Option<Self> {
    let entry: Self = serde_json::from_str(raw).ok()?;
    (entry.expires > entry.timestamp).then_some(entry)
  }

  fn is_live(&self, now: DateTime<Utc>) -> bool {
    now.timestamp_millis() < self.expires
  }
}

/// Counts from a sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  /// Entries under the cache prefix that were inspected
  pub scanned: usize,
  pub expired: usize,
  pub corrupted: usize,
}

impl SweepReport {
  pub fn removed(&self) -> usize {
    self.expired + self.corrupted
  }
}

/// Best-effort media URL cache.
///
/// Every operation degrades to "cache miss" on storage trouble; nothing here
/// returns an error to the caller.
pub struct MediaCache<S: KeyValueStore, C: Clock = SystemClock> {
  storage: Arc<S>,
  clock: Arc<C>,
}

impl<S: KeyValueStore> MediaCache<S> {
  /// Create a cache over the given store using the wall clock.
  pub fn new(storage: S) -> Self {
    Self::with_clock(Arc::new(storage), Arc::new(SystemClock))
  }
}

impl<S: KeyValueStore, C: Clock> MediaCache<S, C> {
  pub fn with_clock(storage: Arc<S>, clock: Arc<C>) -> Self {
    Self { storage, clock }
  }

  /// Namespaced storage key for a post.
  pub fn key_for(post_id: &str) -> String {
    format!("{}{}", CACHE_PREFIX, post_id)
  }

  /// Store a resolved URL for a post.
  ///
  /// Returns false if the store rejected the write. A rejected write triggers
  /// a sweep to free space but is not retried.
  pub fn set(&self, post_id: &str, url: &str) -> bool {
    let entry = CacheEntry::new(url, self.clock.now());
    let value = match serde_json::to_string(&entry) {
      Ok(v) => v,
      Err(e) => {
        warn!(post_id, error = %e, "Failed to serialize cache entry");
        return false;
      }
    };

    match self.storage.set_item(&Self::key_for(post_id), &value) {
      Ok(()) => {
        debug!(post_id, url, "Cached media url");
        true
      }
      Err(e) => {
        warn!(post_id, error = %e, "Cache write failed, sweeping");
        self.sweep();
        false
      }
    }
  }

  /// Look up a live URL for a post.
  ///
  /// Expired and corrupted entries are deleted on the way out.
  pub fn get(&self, post_id: &str) -> Option<String> {
    let key = Self::key_for(post_id);

    let raw = match self.storage.get_item(&key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        debug!(post_id, error = %e, "Cache read failed, treating as miss");
        return None;
      }
    };

    let Some(entry) = CacheEntry::parse(&raw) else {
      debug!(post_id, "Corrupted cache entry, removing");
      self.delete_key(&key);
      return None;
    };

    if !entry.is_live(self.clock.now()) {
      debug!(post_id, "Cache entry expired");
      self.delete_key(&key);
      return None;
    }

    Some(entry.url)
  }

  /// Drop the entry for a post, if any.
  pub fn remove(&self, post_id: &str) {
    self.delete_key(&Self::key_for(post_id));
  }

  /// Remove every expired or unparseable entry under the cache prefix.
  /// Keys outside the prefix are left alone.
  pub fn sweep(&self) -> SweepReport {
    let mut report = SweepReport::default();

    let keys = match self.storage.keys() {
      Ok(keys) => keys,
      Err(e) => {
        warn!(error = %e, "Cache sweep could not list keys");
        return report;
      }
    };

    let now = self.clock.now();
    for key in keys.iter().filter(|k| k.starts_with(CACHE_PREFIX)) {
      report.scanned += 1;

      let entry = match self.storage.get_item(key) {
        Ok(Some(raw)) => CacheEntry::parse(&raw),
        Ok(None) => continue, // removed underneath us
        Err(e) => {
          debug!(key = %key, error = %e, "Cache sweep could not read entry, skipping");
          continue;
        }
      };

      match entry {
        None => {
          report.corrupted += 1;
          self.delete_key(key);
        }
        Some(entry) if !entry.is_live(now) => {
          report.expired += 1;
          self.delete_key(key);
        }
        Some(_) => {}
      }
    }

    info!(
      scanned = report.scanned,
      expired = report.expired,
      corrupted = report.corrupted,
      "Cache sweep finished"
    );
    report
  }

  fn delete_key(&self, key: &str) {
    if let Err(e) = self.storage.remove_item(key) {
      warn!(key, error = %e, "Failed to remove cache entry");
    }
  }
}

impl<S: KeyValueStore, C: Clock> Clone for MediaCache<S, C> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
    }
  }
}
