//! Core traits for the caching system.

use chrono::{DateTime, Utc};
use color_eyre::Result;

/// A namespaced key -> string mapping backing the media cache.
///
/// Implementations only need to make each individual call atomic; the cache
/// makes no consistency promises across concurrent writers.
pub trait KeyValueStore: Send + Sync {
  /// Write a value, replacing any existing one.
  /// Fails when the store cannot accept the write (e.g. quota exceeded).
  fn set_item(&self, key: &str, value: &str) -> Result<()>;

  /// Read a value. Returns None if the key is absent.
  fn get_item(&self, key: &str) -> Result<Option<String>>;

  /// Delete a value. Absent keys are not an error.
  fn remove_item(&self, key: &str) -> Result<()>;

  /// Every key currently stored, in no particular order.
  fn keys(&self) -> Result<Vec<String>>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    (**self).set_item(key, value)
  }

  fn get_item(&self, key: &str) -> Result<Option<String>> {
    (**self).get_item(key)
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    (**self).remove_item(key)
  }

  fn keys(&self) -> Result<Vec<String>> {
    (**self).keys()
  }
}

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Where a resolved media URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
  /// Live entry in the media cache
  Cache,
  /// Derived from the post fields
  Computed,
}
