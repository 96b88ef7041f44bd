/// Reportable gallery conditions. None of these are fatal to the app.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GalleryError {
  #[error("feed has no usable posts")]
  EmptyFeed,
  #[error("page size must be greater than zero")]
  InvalidPageSize,
}
