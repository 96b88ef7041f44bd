//! Gallery core: pagination cursor, viewer navigation, and the dispatch
//! table that connects render-layer input to both.

mod dispatch;
mod error;
mod paginator;

pub use dispatch::{GalleryEvent, GalleryOutcome, Trigger};
pub use error::GalleryError;
pub use paginator::{FeedPaginator, ResolvedPost, DEFAULT_PAGE_SIZE};
