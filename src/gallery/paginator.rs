//! Batch reveal and viewer navigation over a loaded post list.

use tracing::{debug, info};

use crate::cache::{Clock, KeyValueStore, MediaCache, SystemClock, UrlSource};
use crate::feed::Post;

use super::error::GalleryError;

/// Default number of posts revealed per batch
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Pagination cursor and viewer selection
#[derive(Debug, Clone)]
pub struct PaginationState {
  all_posts: Vec<Post>,
  page_size: usize,
  revealed_count: usize,
  is_loading_batch: bool,
  current_index: Option<usize>,
  /// Bumped on every initialize so stale pending batches can be detected
  generation: u64,
}

impl Default for PaginationState {
  fn default() -> Self {
    Self {
      all_posts: Vec::new(),
      page_size: DEFAULT_PAGE_SIZE,
      revealed_count: 0,
      is_loading_batch: false,
      current_index: None,
      generation: 0,
    }
  }
}

impl PaginationState {
  pub fn total(&self) -> usize {
    self.all_posts.len()
  }

  pub fn revealed_count(&self) -> usize {
    self.revealed_count
  }

  pub fn is_loading_batch(&self) -> bool {
    self.is_loading_batch
  }

  pub fn has_more(&self) -> bool {
    self.revealed_count < self.all_posts.len()
  }

  pub fn current_index(&self) -> Option<usize> {
    self.current_index
  }

  /// Size of the batch the next reveal would produce
  pub fn next_batch_size(&self) -> usize {
    self.page_size.min(self.total() - self.revealed_count)
  }
}

/// A post with the URL the render layer should display
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPost {
  pub post: Post,
  pub url: String,
  pub source: UrlSource,
}

/// Display URL for a post and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
  pub url: String,
  pub source: UrlSource,
}

/// Outcome of a reveal. Empty `items` means nothing new was revealed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchResult {
  pub items: Vec<ResolvedPost>,
  pub has_more: bool,
}

/// A batch that has been claimed but not yet computed.
///
/// While one of these is outstanding every other reveal trigger is a no-op.
#[derive(Debug)]
#[must_use = "a pending batch holds the reveal lock until completed"]
pub struct PendingBatch {
  start: usize,
  end: usize,
  generation: u64,
}

/// Owns the pagination state and resolves display URLs through the cache.
pub struct FeedPaginator<S: KeyValueStore, C: Clock = SystemClock> {
  state: PaginationState,
  cache: MediaCache<S, C>,
}

impl<S: KeyValueStore, C: Clock> FeedPaginator<S, C> {
  pub fn new(cache: MediaCache<S, C>) -> Self {
    Self {
      state: PaginationState::default(),
      cache,
    }
  }

  pub fn state(&self) -> &PaginationState {
    &self.state
  }

  pub fn cache(&self) -> &MediaCache<S, C> {
    &self.cache
  }

  /// Replace the post list and reset the cursor.
  ///
  /// The state is reset even when an error is returned, leaving an empty
  /// gallery behind.
  pub fn initialize(&mut self, posts: Vec<Post>, page_size: usize) -> Result<(), GalleryError> {
    let generation = self.state.generation.wrapping_add(1);
    self.state = PaginationState {
      generation,
      ..PaginationState::default()
    };

    if page_size == 0 {
      return Err(GalleryError::InvalidPageSize);
    }
    self.state.page_size = page_size;

    if posts.is_empty() {
      return Err(GalleryError::EmptyFeed);
    }

    info!(posts = posts.len(), page_size, "Gallery initialized");
    self.state.all_posts = posts;
    Ok(())
  }

  /// Reveal the next batch in one step.
  pub fn reveal_next_batch(&mut self) -> BatchResult {
    match self.begin_batch() {
      Some(pending) => self.complete_batch(pending),
      None => self.no_new_items(),
    }
  }

  /// Claim the next batch, or None if a batch is already in flight or the
  /// feed is exhausted.
  pub fn begin_batch(&mut self) -> Option<PendingBatch> {
    if self.state.is_loading_batch {
      debug!("Reveal skipped: batch already in flight");
      return None;
    }
    if !self.state.has_more() {
      debug!("Reveal skipped: no more posts");
      return None;
    }

    self.state.is_loading_batch = true;
    let start = self.state.revealed_count;
    let end = (start + self.state.page_size).min(self.state.all_posts.len());

    Some(PendingBatch {
      start,
      end,
      generation: self.state.generation,
    })
  }

  /// Resolve URLs for a claimed batch and advance the cursor.
  pub fn complete_batch(&mut self, pending: PendingBatch) -> BatchResult {
    if pending.generation != self.state.generation {
      // The feed was replaced while this batch was pending
      debug!("Dropping batch from a previous feed");
      return self.no_new_items();
    }

    let items: Vec<ResolvedPost> = self.state.all_posts[pending.start..pending.end]
      .iter()
      .map(|post| {
        let resolved = self.resolve_url(post);
        ResolvedPost {
          post: post.clone(),
          url: resolved.url,
          source: resolved.source,
        }
      })
      .collect();

    self.state.revealed_count = pending.end;
    self.state.is_loading_batch = false;

    let cached = items
      .iter()
      .filter(|item| item.source == UrlSource::Cache)
      .count();
    info!(
      revealed = self.state.revealed_count,
      total = self.state.total(),
      batch = items.len(),
      cached,
      "Revealed batch"
    );

    BatchResult {
      items,
      has_more: self.state.has_more(),
    }
  }

  fn no_new_items(&self) -> BatchResult {
    BatchResult {
      items: Vec::new(),
      has_more: self.state.has_more(),
    }
  }

  /// Cached URL if live, otherwise the canonical URL from the post fields.
  ///
  /// A computed URL is only cached once the render layer confirms it loaded
  /// (see [`FeedPaginator::confirm_loaded`]).
  pub fn resolve_url(&self, post: &Post) -> ResolvedUrl {
    match self.cache.get(&post.id) {
      Some(url) => ResolvedUrl {
        url,
        source: UrlSource::Cache,
      },
      None => ResolvedUrl {
        url: post.display_url(),
        source: UrlSource::Computed,
      },
    }
  }

  /// The media for a post rendered; remember its URL.
  pub fn confirm_loaded(&self, post_id: &str, url: &str) -> bool {
    self.cache.set(post_id, url)
  }

  /// The media for a post failed to render; forget any cached URL so the
  /// next resolve recomputes it. The cursor is not touched.
  pub fn report_failed(&self, post_id: &str) {
    self.cache.remove(post_id);
  }

  // Viewer navigation

  /// Open the viewer at a revealed index. Out-of-range indices are ignored.
  pub fn select(&mut self, index: usize) -> bool {
    if index < self.state.revealed_count {
      self.state.current_index = Some(index);
      true
    } else {
      false
    }
  }

  pub fn close(&mut self) {
    self.state.current_index = None;
  }

  pub fn current(&self) -> Option<&Post> {
    self
      .state
      .current_index
      .and_then(|i| self.state.all_posts.get(i))
  }

  pub fn can_previous(&self) -> bool {
    matches!(self.state.current_index, Some(i) if i > 0)
  }

  pub fn can_next(&self) -> bool {
    matches!(self.state.current_index, Some(i) if i + 1 < self.state.revealed_count)
  }

  /// Move to the next revealed post. No-op at the last revealed post.
  pub fn next(&mut self) -> Option<usize> {
    if !self.can_next() {
      return None;
    }
    let index = self.state.current_index? + 1;
    self.state.current_index = Some(index);
    Some(index)
  }

  /// Move to the previous post. No-op at the first post.
  pub fn previous(&mut self) -> Option<usize> {
    if !self.can_previous() {
      return None;
    }
    let index = self.state.current_index? - 1;
    self.state.current_index = Some(index);
    Some(index)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::cache::{ManualClock, MemoryStore};
  use crate::feed::MediaType;
  use chrono::{Duration, TimeZone, Utc};
  use std::sync::Arc;

  pub(crate) fn posts(n: usize) -> Vec<Post> {
    (0..n)
      .map(|i| Post {
        id: format!("p{}", i),
        media_type: MediaType::Image,
        media_url: format!("https://cdn.example/{}.jpg", i),
        permalink: format!("https://www.instagram.com/p/{}/", i),
        caption: Some(format!("Post {}", i)),
        timestamp: None,
        thumbnail_url: None,
        children: Vec::new(),
      })
      .collect()
  }

  pub(crate) fn paginator() -> (
    FeedPaginator<MemoryStore, ManualClock>,
    Arc<MemoryStore>,
    Arc<ManualClock>,
  ) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
      Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    let cache = MediaCache::with_clock(Arc::clone(&store), Arc::clone(&clock));
    (FeedPaginator::new(cache), store, clock)
  }

  #[test]
  fn test_batches_of_page_size() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(120), 50).unwrap();

    let mut sizes = Vec::new();
    let mut has_more = Vec::new();
    assert_eq!(p.state().next_batch_size(), 50);
    for _ in 0..3 {
      let batch = p.reveal_next_batch();
      sizes.push(batch.items.len());
      has_more.push(batch.has_more);
    }

    assert_eq!(sizes, vec![50, 50, 20]);
    assert_eq!(p.state().next_batch_size(), 0);
    assert_eq!(has_more, vec![true, true, false]);
  }

  #[test]
  fn test_batches_are_in_source_order() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(7), 3).unwrap();

    let mut ids = Vec::new();
    while p.state().has_more() {
      ids.extend(p.reveal_next_batch().items.into_iter().map(|i| i.post.id));
    }

    let expected: Vec<String> = (0..7).map(|i| format!("p{}", i)).collect();
    assert_eq!(ids, expected);
  }

  #[test]
  fn test_revealed_count_is_monotonic_and_bounded() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(23), 5).unwrap();

    let mut last = 0;
    for _ in 0..10 {
      p.reveal_next_batch();
      let count = p.state().revealed_count();
      assert!(count >= last);
      assert!(count <= 23);
      last = count;
    }
    assert_eq!(last, 23);
  }

  #[test]
  fn test_exhausted_reveal_is_noop() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(4), 10).unwrap();

    let first = p.reveal_next_batch();
    assert_eq!(first.items.len(), 4);
    assert!(!first.has_more);

    let again = p.reveal_next_batch();
    assert!(again.items.is_empty());
    assert!(!again.has_more);
    assert_eq!(p.state().revealed_count(), 4);
  }

  #[test]
  fn test_overlapping_triggers_advance_once() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(120), 50).unwrap();

    let pending = p.begin_batch().unwrap();
    assert!(p.state().is_loading_batch());

    // A second trigger while the first is in flight
    assert!(p.begin_batch().is_none());
    assert!(p.reveal_next_batch().items.is_empty());

    let batch = p.complete_batch(pending);
    assert_eq!(batch.items.len(), 50);
    assert_eq!(p.state().revealed_count(), 50);
    assert!(!p.state().is_loading_batch());
  }

  #[test]
  fn test_stale_pending_batch_is_dropped() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(10), 5).unwrap();
    let pending = p.begin_batch().unwrap();

    p.initialize(posts(3), 5).unwrap();
    let batch = p.complete_batch(pending);

    assert!(batch.items.is_empty());
    assert_eq!(p.state().revealed_count(), 0);
    assert_eq!(p.reveal_next_batch().items.len(), 3);
  }

  #[test]
  fn test_empty_feed() {
    let (mut p, _, _) = paginator();
    assert_eq!(p.initialize(Vec::new(), 50), Err(GalleryError::EmptyFeed));
    assert!(!p.state().has_more());
    assert!(p.reveal_next_batch().items.is_empty());
  }

  #[test]
  fn test_zero_page_size() {
    let (mut p, _, _) = paginator();
    assert_eq!(
      p.initialize(posts(3), 0),
      Err(GalleryError::InvalidPageSize)
    );
    assert_eq!(p.state().total(), 0);
  }

  #[test]
  fn test_initialize_resets_state() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(10), 4).unwrap();
    p.reveal_next_batch();
    p.select(2);

    p.initialize(posts(6), 4).unwrap();
    assert_eq!(p.state().revealed_count(), 0);
    assert_eq!(p.state().current_index(), None);
    assert_eq!(p.state().total(), 6);
  }

  #[test]
  fn test_resolve_prefers_cache() {
    let (mut p, _, _) = paginator();
    let feed = posts(2);
    p.initialize(feed.clone(), 10).unwrap();
    p.confirm_loaded("p1", "https://cached.example/p1.jpg");

    let batch = p.reveal_next_batch();
    assert_eq!(batch.items[0].source, UrlSource::Computed);
    assert_eq!(batch.items[0].url, feed[0].display_url());
    assert_eq!(batch.items[1].source, UrlSource::Cache);
    assert_eq!(batch.items[1].url, "https://cached.example/p1.jpg");
  }

  #[test]
  fn test_computed_urls_are_not_cached_until_confirmed() {
    let (mut p, store, _) = paginator();
    p.initialize(posts(3), 10).unwrap();
    p.reveal_next_batch();
    assert_eq!(store.len(), 0);

    assert!(p.confirm_loaded("p0", "https://www.instagram.com/p/0/media/?size=l"));
    assert_eq!(store.len(), 1);
  }

  #[test]
  fn test_failure_evicts_without_rolling_back() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(3), 10).unwrap();
    p.confirm_loaded("p0", "https://stale.example/p0.jpg");
    p.reveal_next_batch();

    p.report_failed("p0");
    assert_eq!(p.state().revealed_count(), 3);

    let resolved = p.resolve_url(&posts(1)[0]);
    assert_eq!(resolved.source, UrlSource::Computed);
  }

  #[test]
  fn test_expired_cache_entry_recomputes() {
    let (mut p, _, clock) = paginator();
    p.initialize(posts(1), 10).unwrap();
    p.confirm_loaded("p0", "https://cached.example/p0.jpg");
    clock.advance(Duration::hours(24));

    let batch = p.reveal_next_batch();
    assert_eq!(batch.items[0].source, UrlSource::Computed);
  }

  #[test]
  fn test_navigation_bounds() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(10), 4).unwrap();
    p.reveal_next_batch();

    assert!(p.select(0));
    assert!(!p.can_previous());
    assert_eq!(p.previous(), None);
    assert_eq!(p.state().current_index(), Some(0));

    assert_eq!(p.next(), Some(1));
    assert_eq!(p.next(), Some(2));
    assert_eq!(p.next(), Some(3));

    // Post 4 exists but isn't revealed yet
    assert!(!p.can_next());
    assert_eq!(p.next(), None);
    assert_eq!(p.state().current_index(), Some(3));

    p.reveal_next_batch();
    assert_eq!(p.next(), Some(4));
  }

  #[test]
  fn test_select_only_revealed() {
    let (mut p, _, _) = paginator();
    p.initialize(posts(10), 4).unwrap();
    p.reveal_next_batch();

    assert!(!p.select(4));
    assert_eq!(p.state().current_index(), None);
    assert!(p.select(3));
    assert_eq!(p.current().map(|post| post.id.as_str()), Some("p3"));

    p.close();
    assert_eq!(p.current(), None);
    assert_eq!(p.next(), None);
  }
}
