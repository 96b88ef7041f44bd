use ratatui::prelude::Color;

use crate::app::MediaStatus;
use crate::cache::UrlSource;
use crate::feed::MediaType;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// First line of a caption, for single-line slots
pub fn first_line(s: &str) -> &str {
  s.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

/// Glyph shown in tile titles
pub fn media_icon(media_type: MediaType) -> &'static str {
  match media_type {
    MediaType::Image => "▣",
    MediaType::Video => "▶",
    MediaType::CarouselAlbum => "❐",
    MediaType::Reel => "◉",
    MediaType::Unknown => "?",
  }
}

pub fn status_color(status: MediaStatus) -> Color {
  match status {
    MediaStatus::Pending => Color::Yellow,
    MediaStatus::Loaded => Color::Green,
    MediaStatus::Failed => Color::Red,
  }
}

pub fn status_label(status: MediaStatus, source: UrlSource) -> &'static str {
  match (status, source) {
    (MediaStatus::Failed, _) => "unavailable",
    (MediaStatus::Pending, _) => "loading",
    (MediaStatus::Loaded, UrlSource::Cache) => "cached",
    (MediaStatus::Loaded, UrlSource::Computed) => "loaded",
  }
}
