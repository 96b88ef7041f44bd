//! Event-to-method dispatch for the paginator.
//!
//! The render layer turns input (keys, scroll position, probe results) into
//! `GalleryEvent`s; this is the only place they map onto paginator calls.

use tracing::{debug, warn};

use crate::cache::{Clock, KeyValueStore};

use super::paginator::{BatchResult, FeedPaginator};

/// What caused a reveal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
  /// Explicit "load more" control
  Button,
  /// End-of-grid sentinel came into view (infinite scroll)
  Sentinel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryEvent {
  LoadMore(Trigger),
  Select(usize),
  Next,
  Previous,
  Close,
  MediaLoaded { post_id: String, url: String },
  MediaFailed { post_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GalleryOutcome {
  /// A reveal was attempted; empty items means it was a no-op
  Revealed(BatchResult),
  /// Viewer moved to this index
  Moved(usize),
  Closed,
  /// Result of a cache write after a confirmed load
  Cached(bool),
  Evicted,
  /// Nothing changed (boundary, out of range)
  Unchanged,
}

impl<S: KeyValueStore, C: Clock> FeedPaginator<S, C> {
  pub fn handle(&mut self, event: GalleryEvent) -> GalleryOutcome {
    match event {
      GalleryEvent::LoadMore(trigger) => {
        debug!(?trigger, "Reveal requested");
        GalleryOutcome::Revealed(self.reveal_next_batch())
      }
      GalleryEvent::Select(index) => {
        if self.select(index) {
          GalleryOutcome::Moved(index)
        } else {
          GalleryOutcome::Unchanged
        }
      }
      GalleryEvent::Next => self
        .next()
        .map(GalleryOutcome::Moved)
        .unwrap_or(GalleryOutcome::Unchanged),
      GalleryEvent::Previous => self
        .previous()
        .map(GalleryOutcome::Moved)
        .unwrap_or(GalleryOutcome::Unchanged),
      GalleryEvent::Close => {
        self.close();
        GalleryOutcome::Closed
      }
      GalleryEvent::MediaLoaded { post_id, url } => {
        let cached = self.confirm_loaded(&post_id, &url);
        if !cached {
          warn!(%post_id, "Proceeding without caching media url");
        }
        GalleryOutcome::Cached(cached)
      }
      GalleryEvent::MediaFailed { post_id } => {
        self.report_failed(&post_id);
        GalleryOutcome::Evicted
      }
    }
  }
}
