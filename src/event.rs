use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::feed::FeedLoad;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and sentinel checks
  Tick,
  /// Feed document finished loading
  Feed(FeedEvent),
  /// A media probe finished
  Media(MediaEvent),
}

#[derive(Debug)]
pub enum FeedEvent {
  Loaded(FeedLoad),
  Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
  Loaded { post_id: String, url: String },
  Failed { post_id: String, reason: String },
}

/// Event handler that produces events from terminal input and a tick timer,
/// and accepts events from background tasks through `sender()`.
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let input_tx = tx.clone();

    // Terminal polling blocks, keep it off the async workers
    tokio::task::spawn_blocking(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        if let Ok(CrosstermEvent::Key(key)) = event::read() {
          if key.kind != KeyEventKind::Press {
            continue;
          }
          if input_tx.send(Event::Key(key)).is_err() {
            break;
          }
        }
      } else if input_tx.send(Event::Tick).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Sender for background tasks
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
