//! Post feed: data types, the document source, and media load checks.

pub mod probe;
pub mod source;
pub mod types;

pub use probe::{MediaProber, ProbeTarget};
pub use source::{load_feed, FeedFilter, FeedLoad, FeedSource};
pub use types::{MediaType, Post};
