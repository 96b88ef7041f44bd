//! Confirms that resolved media URLs actually load.
//!
//! A terminal can't decode the image, so "rendered" means the URL answered
//! with a success status. Results come back to the app as events.

use color_eyre::{eyre::eyre, Result};
use futures::StreamExt;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::event::{Event, MediaEvent};

/// Max probes in flight per batch
const PROBE_CONCURRENCY: usize = 8;

/// A URL to confirm for a post
#[derive(Debug, Clone)]
pub struct ProbeTarget {
  pub post_id: String,
  pub url: String,
}

/// Spawns media checks and reports each outcome on the event channel
#[derive(Clone)]
pub struct MediaProber {
  client: reqwest::Client,
  tx: mpsc::UnboundedSender<Event>,
}

impl MediaProber {
  pub fn new(client: reqwest::Client, tx: mpsc::UnboundedSender<Event>) -> Self {
    Self { client, tx }
  }

  /// Check every target in the background. Fire-and-forget: the caller
  /// never waits on this.
  pub fn probe_batch(&self, targets: Vec<ProbeTarget>) {
    if targets.is_empty() {
      return;
    }

    let client = self.client.clone();
    let tx = self.tx.clone();

    tokio::spawn(async move {
      futures::stream::iter(targets)
        .for_each_concurrent(PROBE_CONCURRENCY, |target| {
          let client = client.clone();
          let tx = tx.clone();
          async move {
            let event = match check_media(&client, &target.url).await {
              Ok(()) => {
                debug!(post_id = %target.post_id, "Media loaded");
                MediaEvent::Loaded {
                  post_id: target.post_id,
                  url: target.url,
                }
              }
              Err(e) => {
                warn!(post_id = %target.post_id, error = %e, "Media failed to load");
                MediaEvent::Failed {
                  post_id: target.post_id,
                  reason: e.to_string(),
                }
              }
            };
            // Ignore send errors - app may be shutting down
            let _ = tx.send(Event::Media(event));
          }
        })
        .await;
    });
  }
}

/// HEAD the URL, falling back to GET for servers that refuse HEAD.
async fn check_media(client: &reqwest::Client, url: &str) -> Result<()> {
  let response = client
    .head(url)
    .send()
    .await
    .map_err(|e| eyre!("Request failed: {}", e))?;

  let status = if response.status() == StatusCode::METHOD_NOT_ALLOWED {
    client
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Request failed: {}", e))?
      .status()
  } else {
    response.status()
  };

  if status.is_success() {
    Ok(())
  } else {
    Err(eyre!("HTTP {}", status))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_invalid_url_fails() {
    let client = reqwest::Client::new();
    assert!(check_media(&client, "not a url").await.is_err());
  }

  #[tokio::test]
  async fn test_failed_probe_reports_event() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let prober = MediaProber::new(reqwest::Client::new(), tx);

    prober.probe_batch(vec![ProbeTarget {
      post_id: "p1".to_string(),
      url: "not a url".to_string(),
    }]);

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
      .await
      .unwrap()
      .unwrap();
    match event {
      Event::Media(MediaEvent::Failed { post_id, .. }) => assert_eq!(post_id, "p1"),
      other => panic!("unexpected event: {:?}", other),
    }
  }
}
