use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::feed::{FeedFilter, FeedSource, MediaType};
use crate::gallery::DEFAULT_PAGE_SIZE;

/// Feed used when nothing else is configured
const DEFAULT_FEED: &str = "data/instagram.json";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub feed: FeedConfig,
  #[serde(default)]
  pub gallery: GalleryConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Custom title for header (defaults to the feed source if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedConfig {
  /// Path or http(s) URL of the feed document
  pub source: Option<String>,
}

/// How the next batch gets requested
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
  /// Explicit "load more" control
  #[default]
  Button,
  /// Reveal when the end of the grid scrolls into view
  Infinite,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
  pub page_size: usize,
  /// Upper bound on posts taken from the feed
  pub max_posts: usize,
  pub allowed_media_types: Vec<MediaType>,
  pub trigger: TriggerMode,
  /// Check that media URLs load before caching them.
  /// When off, every revealed URL is treated as loaded.
  pub verify_media: bool,
}

impl Default for GalleryConfig {
  fn default() -> Self {
    Self {
      page_size: DEFAULT_PAGE_SIZE,
      max_posts: 270,
      allowed_media_types: vec![MediaType::Image, MediaType::CarouselAlbum, MediaType::Video],
      trigger: TriggerMode::Button,
      verify_media: true,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  /// Database path (default: $XDG_DATA_HOME/feedgrid/cache.db)
  pub path: Option<PathBuf>,
  /// Reject new entries past this many rows
  pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
      max_entries: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./feedgrid.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/feedgrid/config.yaml
  ///
  /// With no file found the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Config::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("feedgrid.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("feedgrid").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.gallery.page_size == 0 {
      return Err(eyre!("gallery.page_size must be greater than zero"));
    }
    if self.gallery.allowed_media_types.is_empty() {
      return Err(eyre!("gallery.allowed_media_types must not be empty"));
    }
    Ok(())
  }

  /// Resolve the feed source.
  ///
  /// Checks the config file, then FEEDGRID_FEED, then falls back to
  /// `data/instagram.json`.
  pub fn feed_source(&self) -> Result<FeedSource> {
    let raw = self
      .feed
      .source
      .clone()
      .or_else(|| std::env::var("FEEDGRID_FEED").ok())
      .unwrap_or_else(|| DEFAULT_FEED.to_string());
    FeedSource::parse(&raw)
  }

  pub fn feed_filter(&self) -> FeedFilter {
    FeedFilter {
      allowed_media_types: self.gallery.allowed_media_types.clone(),
      max_posts: self.gallery.max_posts,
    }
  }
}

/// Per-user data directory for the cache database and logs.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("feedgrid"))
}
