use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Kind of media a post carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
  Image,
  Video,
  CarouselAlbum,
  Reel,
  /// Anything the feed reports that we don't know how to show
  #[serde(other)]
  Unknown,
}

impl MediaType {
  pub fn label(&self) -> &'static str {
    match self {
      MediaType::Image => "image",
      MediaType::Video => "video",
      MediaType::CarouselAlbum => "carousel",
      MediaType::Reel => "reel",
      MediaType::Unknown => "unknown",
    }
  }

  pub fn is_video(&self) -> bool {
    matches!(self, MediaType::Video | MediaType::Reel)
  }
}

/// A single post from the feed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
  pub id: String,
  pub media_type: MediaType,
  #[serde(default)]
  pub media_url: String,
  #[serde(default)]
  pub permalink: String,
  #[serde(default)]
  pub caption: Option<String>,
  #[serde(default)]
  pub timestamp: Option<String>,
  #[serde(default)]
  pub thumbnail_url: Option<String>,
  /// Carousel children, in display order
  #[serde(default, deserialize_with = "deserialize_children")]
  pub children: Vec<Post>,
}

impl Post {
  /// Canonical display URL derived from the post fields.
  ///
  /// Images and carousels use the permalink media redirect at large size;
  /// videos use their thumbnail when the feed provides one.
  pub fn display_url(&self) -> String {
    if self.media_type.is_video() {
      return self
        .thumbnail_url
        .clone()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| self.media_url.clone());
    }
    if self.permalink.is_empty() {
      return self.media_url.clone();
    }
    format!("{}/media/?size=l", self.permalink.trim_end_matches('/'))
  }

  /// Publish time, if the feed provided a parseable one.
  ///
  /// Accepts RFC 3339 and the Graph API's `+0000` offset form.
  pub fn published_at(&self) -> Option<DateTime<Utc>> {
    let raw = self.timestamp.as_deref()?;
    DateTime::parse_from_rfc3339(raw)
      .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
      .map(|dt| dt.with_timezone(&Utc))
      .ok()
  }

  pub fn caption_or_default(&self) -> &str {
    self
      .caption
      .as_deref()
      .filter(|c| !c.trim().is_empty())
      .unwrap_or("Instagram post")
  }
}

/// Top-level feed document: `{ "data": [...] }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedDocument {
  #[serde(default)]
  pub data: Vec<Post>,
}

/// Children come either as a bare array or wrapped as `{ "data": [...] }`.
fn deserialize_children<'de, D>(deserializer: D) -> Result<Vec<Post>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Children {
    List(Vec<Post>),
    Wrapped { data: Vec<Post> },
  }

  let children: Option<Children> = Option::deserialize(deserializer)?;
  Ok(match children {
    Some(Children::List(posts)) | Some(Children::Wrapped { data: posts }) => posts,
    None => Vec::new(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn post(media_type: MediaType) -> Post {
    Post {
      id: "1".to_string(),
      media_type,
      media_url: "https://cdn.example/1.jpg".to_string(),
      permalink: "https://www.instagram.com/p/abc/".to_string(),
      caption: None,
      timestamp: None,
      thumbnail_url: None,
      children: Vec::new(),
    }
  }

  #[test]
  fn test_image_url_uses_permalink() {
    assert_eq!(
      post(MediaType::Image).display_url(),
      "https://www.instagram.com/p/abc/media/?size=l"
    );

    let mut p = post(MediaType::CarouselAlbum);
    p.permalink = "https://www.instagram.com/p/abc".to_string();
    assert_eq!(p.display_url(), "https://www.instagram.com/p/abc/media/?size=l");
  }

  #[test]
  fn test_image_without_permalink_uses_media_url() {
    let mut p = post(MediaType::Image);
    p.permalink.clear();
    assert_eq!(p.display_url(), "https://cdn.example/1.jpg");
  }

  #[test]
  fn test_video_url_prefers_thumbnail() {
    let mut p = post(MediaType::Video);
    assert_eq!(p.display_url(), "https://cdn.example/1.jpg");

    p.thumbnail_url = Some("https://cdn.example/thumb.jpg".to_string());
    assert_eq!(p.display_url(), "https://cdn.example/thumb.jpg");
  }

  #[test]
  fn test_parse_graph_api_document() {
    let json = r#"{
      "data": [
        {
          "id": "17900",
          "caption": "Sunset",
          "media_type": "CAROUSEL_ALBUM",
          "media_url": "https://cdn.example/a.jpg",
          "permalink": "https://www.instagram.com/p/A/",
          "timestamp": "2024-03-01T18:30:00+0000",
          "children": { "data": [
            { "id": "c1", "media_type": "IMAGE", "media_url": "https://cdn.example/c1.jpg" },
            { "id": "c2", "media_type": "VIDEO", "media_url": "https://cdn.example/c2.mp4" }
          ] }
        },
        { "id": "17901", "media_type": "STORY", "media_url": "https://cdn.example/s.jpg" }
      ],
      "paging": { "cursors": { "after": "x" } }
    }"#;

    let doc: FeedDocument = serde_json::from_str(json).unwrap();
    assert_eq!(doc.data.len(), 2);

    let first = &doc.data[0];
    assert_eq!(first.media_type, MediaType::CarouselAlbum);
    assert_eq!(first.children.len(), 2);
    assert_eq!(first.children[1].media_type, MediaType::Video);
    assert!(first.published_at().is_some());

    assert_eq!(doc.data[1].media_type, MediaType::Unknown);
  }

  #[test]
  fn test_children_as_plain_array() {
    let json = r#"{ "id": "1", "media_type": "CAROUSEL_ALBUM",
      "children": [ { "id": "c1", "media_type": "IMAGE" } ] }"#;
    let post: Post = serde_json::from_str(json).unwrap();
    assert_eq!(post.children.len(), 1);
  }

  #[test]
  fn test_missing_data_is_empty() {
    let doc: FeedDocument = serde_json::from_str("{}").unwrap();
    assert!(doc.data.is_empty());
  }

  #[test]
  fn test_caption_default() {
    let mut p = post(MediaType::Image);
    assert_eq!(p.caption_or_default(), "Instagram post");
    p.caption = Some("  ".to_string());
    assert_eq!(p.caption_or_default(), "Instagram post");
    p.caption = Some("Hello".to_string());
    assert_eq!(p.caption_or_default(), "Hello");
  }
}
