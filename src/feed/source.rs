//! Loading the post list from a local document or a remote URL.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::{debug, info};
use url::Url;

use super::types::{FeedDocument, MediaType, Post};

/// Where the feed document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
  File(PathBuf),
  Remote(Url),
}

impl FeedSource {
  /// http(s) URLs are fetched, anything else is a file path.
  pub fn parse(raw: &str) -> Result<Self> {
    let raw = raw.trim();
    if raw.is_empty() {
      return Err(eyre!("Feed source is empty"));
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
      let url = Url::parse(raw).map_err(|e| eyre!("Invalid feed URL {}: {}", raw, e))?;
      Ok(FeedSource::Remote(url))
    } else {
      Ok(FeedSource::File(PathBuf::from(raw)))
    }
  }

  /// Short label for the header
  pub fn label(&self) -> String {
    match self {
      FeedSource::File(path) => path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string()),
      FeedSource::Remote(url) => url.host_str().unwrap_or(url.as_str()).to_string(),
    }
  }
}

/// Upstream filter applied before the paginator sees the posts
#[derive(Debug, Clone)]
pub struct FeedFilter {
  pub allowed_media_types: Vec<MediaType>,
  pub max_posts: usize,
}

/// Posts that survived filtering, plus how many the document had.
#[derive(Debug, Clone)]
pub struct FeedLoad {
  pub posts: Vec<Post>,
  pub total: usize,
}

impl FeedLoad {
  /// Message for the empty state, if there is nothing to show.
  pub fn empty_message(&self) -> Option<&'static str> {
    if !self.posts.is_empty() {
      None
    } else if self.total == 0 {
      Some("No posts found")
    } else {
      Some("No compatible posts found")
    }
  }
}

impl FeedFilter {
  pub fn apply(&self, doc: FeedDocument) -> FeedLoad {
    let total = doc.data.len();
    let posts: Vec<Post> = doc
      .data
      .into_iter()
      .filter(|post| {
        let allowed = self.allowed_media_types.contains(&post.media_type);
        if !allowed {
          debug!(post_id = %post.id, media_type = ?post.media_type, "Skipping post");
        }
        allowed
      })
      .take(self.max_posts)
      .collect();

    FeedLoad { posts, total }
  }
}

/// Read and parse the feed document.
pub async fn fetch_document(source: &FeedSource, client: &reqwest::Client) -> Result<FeedDocument> {
  let body = match source {
    FeedSource::File(path) => tokio::fs::read_to_string(path)
      .await
      .map_err(|e| eyre!("Failed to read feed {}: {}", path.display(), e))?,
    FeedSource::Remote(url) => {
      let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch feed {}: {}", url, e))?;

      let status = response.status();
      if !status.is_success() {
        return Err(eyre!("Failed to fetch feed {}: HTTP {}", url, status));
      }

      response
        .text()
        .await
        .map_err(|e| eyre!("Failed to read feed body from {}: {}", url, e))?
    }
  };

  let doc: FeedDocument =
    serde_json::from_str(&body).map_err(|e| eyre!("Failed to parse feed document: {}", e))?;
  Ok(doc)
}

/// Fetch the document and apply the upstream filter.
pub async fn load_feed(
  source: &FeedSource,
  filter: &FeedFilter,
  client: &reqwest::Client,
) -> Result<FeedLoad> {
  let doc = fetch_document(source, client).await?;
  let load = filter.apply(doc);
  info!(
    source = %source.label(),
    total = load.total,
    usable = load.posts.len(),
    "Feed loaded"
  );
  Ok(load)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc(types: &[MediaType]) -> FeedDocument {
    FeedDocument {
      data: types
        .iter()
        .enumerate()
        .map(|(i, t)| Post {
          id: i.to_string(),
          media_type: *t,
          media_url: format!("https://cdn.example/{}.jpg", i),
          permalink: format!("https://www.instagram.com/p/{}/", i),
          caption: None,
          timestamp: None,
          thumbnail_url: None,
          children: Vec::new(),
        })
        .collect(),
    }
  }

  fn filter(max_posts: usize) -> FeedFilter {
    FeedFilter {
      allowed_media_types: vec![MediaType::Image, MediaType::CarouselAlbum, MediaType::Video],
      max_posts,
    }
  }

  #[test]
  fn test_parse_source() {
    assert_eq!(
      FeedSource::parse("data/instagram.json").unwrap(),
      FeedSource::File(PathBuf::from("data/instagram.json"))
    );
    assert!(matches!(
      FeedSource::parse("https://example.com/feed.json").unwrap(),
      FeedSource::Remote(_)
    ));
    assert!(FeedSource::parse("  ").is_err());
  }

  #[test]
  fn test_source_label() {
    assert_eq!(
      FeedSource::parse("data/instagram.json").unwrap().label(),
      "instagram.json"
    );
    assert_eq!(
      FeedSource::parse("https://cdn.example.com/x/feed.json")
        .unwrap()
        .label(),
      "cdn.example.com"
    );
  }

  #[test]
  fn test_filter_drops_disallowed_types_in_order() {
    let load = filter(100).apply(doc(&[
      MediaType::Image,
      MediaType::Reel,
      MediaType::Video,
      MediaType::Unknown,
      MediaType::CarouselAlbum,
    ]));

    assert_eq!(load.total, 5);
    let ids: Vec<&str> = load.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "2", "4"]);
  }

  #[test]
  fn test_filter_caps_at_max_posts() {
    let load = filter(2).apply(doc(&[MediaType::Image; 5]));
    assert_eq!(load.posts.len(), 2);
    assert_eq!(load.posts[1].id, "1");
  }

  #[test]
  fn test_empty_messages() {
    let load = filter(10).apply(doc(&[]));
    assert_eq!(load.empty_message(), Some("No posts found"));

    let load = filter(10).apply(doc(&[MediaType::Reel]));
    assert_eq!(load.empty_message(), Some("No compatible posts found"));

    let load = filter(10).apply(doc(&[MediaType::Image]));
    assert_eq!(load.empty_message(), None);
  }

  #[tokio::test]
  async fn test_load_feed_from_file() {
    let dir = std::env::temp_dir().join(format!("feedgrid-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("feed.json");
    std::fs::write(
      &path,
      r#"{"data": [{"id": "1", "media_type": "IMAGE", "permalink": "https://www.instagram.com/p/a/"}]}"#,
    )
    .unwrap();

    let source = FeedSource::File(path);
    let load = load_feed(&source, &filter(10), &reqwest::Client::new())
      .await
      .unwrap();
    assert_eq!(load.posts.len(), 1);

    std::fs::remove_dir_all(&dir).ok();
  }

  #[tokio::test]
  async fn test_load_feed_missing_file() {
    let source = FeedSource::File(PathBuf::from("/definitely/not/here.json"));
    let result = load_feed(&source, &filter(10), &reqwest::Client::new()).await;
    assert!(result.is_err());
  }
}
