use crate::cache::{KeyValueStore, MediaCache, UrlSource};
use crate::commands::{self, Command};
use crate::config::{Config, TriggerMode};
use crate::event::{Event, EventHandler, FeedEvent, MediaEvent};
use crate::feed::{self, FeedLoad, FeedSource, MediaProber, Post, ProbeTarget};
use crate::gallery::{
  FeedPaginator, GalleryError, GalleryEvent, GalleryOutcome, ResolvedPost, Trigger,
};
use crate::ui;
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Store behind the media cache, chosen at startup
pub type Store = Box<dyn KeyValueStore>;

/// Shown in place of media that failed to load
pub const PLACEHOLDER_URL: &str = "https://placehold.co/600x600?text=Image+Unavailable";

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
}

/// Which surface has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  Grid,
  Viewer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
  Loading,
  Ready,
  /// Nothing to show; message for the empty state
  Empty(String),
  Failed(String),
}

/// Render status of a tile's media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
  Pending,
  Loaded,
  Failed,
}

/// A revealed post as the grid shows it
#[derive(Debug, Clone)]
pub struct Tile {
  pub item: ResolvedPost,
  pub status: MediaStatus,
}

impl Tile {
  /// URL to display, or the placeholder if loading failed
  pub fn display_url(&self) -> &str {
    match self.status {
      MediaStatus::Failed => PLACEHOLDER_URL,
      _ => &self.item.url,
    }
  }
}

/// Grid geometry recorded on each draw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridLayout {
  pub columns: usize,
  pub first_row: usize,
  pub visible_rows: usize,
}

/// Main application state
pub struct App {
  /// Application configuration
  config: Config,

  source: FeedSource,

  /// Pagination cursor, viewer selection and media cache
  paginator: FeedPaginator<Store>,

  /// Revealed posts in display order
  tiles: Vec<Tile>,

  feed_state: FeedState,

  screen: Screen,

  /// Current input mode
  mode: Mode,

  /// Grid selection. May point one past the last tile at the load-more control.
  selected: usize,

  layout: GridLayout,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// One-line message for the status bar
  status_message: Option<String>,

  client: reqwest::Client,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config, source: FeedSource, store: Store) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .user_agent(concat!("feedgrid/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    let (tx, _rx) = mpsc::unbounded_channel();

    Ok(Self {
      config,
      source,
      paginator: FeedPaginator::new(MediaCache::new(store)),
      tiles: Vec::new(),
      feed_state: FeedState::Loading,
      screen: Screen::Grid,
      mode: Mode::Normal,
      selected: 0,
      layout: GridLayout::default(),
      command_input: String::new(),
      selected_suggestion: 0,
      status_message: None,
      client,
      event_tx: tx,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    // Initial data load
    self.load_feed();

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal, even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Handle events
      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }
    Ok(())
  }

  fn load_feed(&mut self) {
    self.feed_state = FeedState::Loading;

    let source = self.source.clone();
    let filter = self.config.feed_filter();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let event = match feed::load_feed(&source, &filter, &client).await {
        Ok(load) => FeedEvent::Loaded(load),
        Err(e) => FeedEvent::Failed(e.to_string()),
      };
      let _ = tx.send(Event::Feed(event));
    });
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.check_sentinel(),
      Event::Feed(feed_event) => self.handle_feed_event(feed_event),
      Event::Media(media_event) => self.handle_media_event(media_event),
    }
  }

  fn handle_feed_event(&mut self, event: FeedEvent) {
    match event {
      FeedEvent::Loaded(load) => self.show_feed(load),
      FeedEvent::Failed(msg) => {
        warn!(error = %msg, "Feed failed to load");
        self.feed_state = FeedState::Failed(msg);
      }
    }
  }

  fn show_feed(&mut self, load: FeedLoad) {
    let empty_message = load.empty_message().unwrap_or("No posts found");

    self.tiles.clear();
    self.selected = 0;
    self.screen = Screen::Grid;

    match self
      .paginator
      .initialize(load.posts, self.config.gallery.page_size)
    {
      Ok(()) => {
        self.feed_state = FeedState::Ready;
        // First batch isn't user-triggered but goes through the same path
        self.reveal(Trigger::Button);
      }
      Err(GalleryError::EmptyFeed) => {
        info!(total = load.total, "Nothing to show");
        self.feed_state = FeedState::Empty(empty_message.to_string());
      }
      Err(e) => self.feed_state = FeedState::Failed(e.to_string()),
    }
  }

  /// Ask the paginator for the next batch and start confirming its media.
  fn reveal(&mut self, trigger: Trigger) {
    let GalleryOutcome::Revealed(batch) = self.paginator.handle(GalleryEvent::LoadMore(trigger))
    else {
      return;
    };
    if batch.items.is_empty() {
      return;
    }

    let verify = self.config.gallery.verify_media;
    let mut targets = Vec::new();

    for item in batch.items {
      let status = if verify {
        targets.push(ProbeTarget {
          post_id: item.post.id.clone(),
          url: item.url.clone(),
        });
        MediaStatus::Pending
      } else {
        if item.source == UrlSource::Computed {
          self.paginator.handle(GalleryEvent::MediaLoaded {
            post_id: item.post.id.clone(),
            url: item.url.clone(),
          });
        }
        MediaStatus::Loaded
      };
      self.tiles.push(Tile { item, status });
    }

    MediaProber::new(self.client.clone(), self.event_tx.clone()).probe_batch(targets);
  }

  fn handle_media_event(&mut self, event: MediaEvent) {
    match event {
      MediaEvent::Loaded { post_id, url } => {
        let Some(tile) = self.tiles.iter_mut().find(|t| t.item.post.id == post_id) else {
          return;
        };
        if tile.item.url != url {
          return; // stale probe from an earlier feed
        }
        tile.status = MediaStatus::Loaded;

        // Cache hits are already stored; only new URLs get written
        if tile.item.source == UrlSource::Computed {
          let outcome = self
            .paginator
            .handle(GalleryEvent::MediaLoaded { post_id, url });
          if outcome == GalleryOutcome::Cached(false) {
            self.status_message = Some("Cache full, continuing without caching".to_string());
          }
        }
      }
      MediaEvent::Failed { post_id, reason } => {
        let Some(tile) = self.tiles.iter_mut().find(|t| t.item.post.id == post_id) else {
          return;
        };
        tile.status = MediaStatus::Failed;
        warn!(%post_id, %reason, "Showing placeholder");
        self
          .paginator
          .handle(GalleryEvent::MediaFailed { post_id });
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.mode {
      Mode::Normal => match self.screen {
        Screen::Grid => self.handle_grid_key(key),
        Screen::Viewer => self.handle_viewer_key(key),
      },
      Mode::Command => self.handle_command_mode_key(key),
    }
  }

  fn handle_grid_key(&mut self, key: KeyEvent) {
    let columns = self.layout.columns.max(1) as isize;

    match key.code {
      KeyCode::Char('q') => self.should_quit = true,

      // Navigation
      KeyCode::Left | KeyCode::Char('h') => self.move_selection(-1),
      KeyCode::Right | KeyCode::Char('l') => self.move_selection(1),
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-columns),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(columns),
      KeyCode::Char('g') | KeyCode::Home => self.selected = 0,
      KeyCode::Char('G') | KeyCode::End => {
        self.selected = self.selectable_len().saturating_sub(1);
      }
      KeyCode::Enter => self.enter_selected(),

      KeyCode::Char('m') => self.reveal(Trigger::Button),
      KeyCode::Char('r') => self.reload(),

      // Mode switches
      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
      }

      _ => {}
    }

    self.check_sentinel();
  }

  fn handle_viewer_key(&mut self, key: KeyEvent) {
    let event = match key.code {
      KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('p') => GalleryEvent::Previous,
      KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('n') => GalleryEvent::Next,
      KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => GalleryEvent::Close,
      _ => return,
    };

    let current = self.paginator.state().current_index();
    match self.paginator.handle(event) {
      GalleryOutcome::Moved(index) => self.selected = index,
      GalleryOutcome::Closed => {
        if let Some(index) = current {
          self.selected = index;
        }
        self.screen = Screen::Grid;
      }
      _ => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0; // Reset selection on input change
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0; // Reset selection on input change
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    // Get the command to execute - either from selected suggestion or direct input
    let suggestions = commands::get_suggestions(&self.command_input);
    let cmd = match suggestions.get(self.selected_suggestion) {
      Some(cmd) => cmd.name.to_string(),
      None => self.command_input.trim().to_lowercase(),
    };

    match cmd.as_str() {
      "more" => self.reveal(Trigger::Button),
      "top" => self.selected = 0,
      "sweep" => {
        let report = self.paginator.cache().sweep();
        self.status_message = Some(format!(
          "Cache sweep removed {} of {} entries",
          report.removed(),
          report.scanned
        ));
      }
      "reload" => self.reload(),
      "quit" => self.should_quit = true,
      other => {
        self.status_message = Some(format!("Unknown command: {}", other));
      }
    }
    self.command_input.clear();
  }

  fn reload(&mut self) {
    self.status_message = None;
    self.load_feed();
  }

  /// Tiles plus the load-more control when it is shown
  fn selectable_len(&self) -> usize {
    self.tiles.len() + usize::from(self.shows_load_more())
  }

  fn move_selection(&mut self, delta: isize) {
    let len = self.selectable_len();
    if len == 0 {
      return;
    }
    let target = self.selected as isize + delta;
    self.selected = target.clamp(0, len as isize - 1) as usize;
  }

  fn enter_selected(&mut self) {
    if self.selected == self.tiles.len() && self.shows_load_more() {
      self.reveal(Trigger::Button);
      return;
    }

    if self.paginator.handle(GalleryEvent::Select(self.selected)) != GalleryOutcome::Unchanged {
      self.screen = Screen::Viewer;
    }
  }

  /// Infinite scroll: reveal when the end-of-grid sentinel is on screen.
  fn check_sentinel(&mut self) {
    if self.config.gallery.trigger != TriggerMode::Infinite
      || self.screen != Screen::Grid
      || self.feed_state != FeedState::Ready
      || !self.paginator.state().has_more()
      || self.paginator.state().is_loading_batch()
    {
      return;
    }

    if self.sentinel_visible() {
      self.reveal(Trigger::Sentinel);
    }
  }

  fn sentinel_visible(&self) -> bool {
    let GridLayout {
      columns,
      first_row,
      visible_rows,
    } = self.layout;
    if columns == 0 || visible_rows == 0 {
      return false;
    }
    // The sentinel sits in the slot right after the last tile
    let sentinel_row = self.tiles.len() / columns;
    sentinel_row >= first_row && sentinel_row < first_row + visible_rows
  }

  // Accessors for UI rendering

  pub fn tiles(&self) -> &[Tile] {
    &self.tiles
  }

  pub fn selected(&self) -> usize {
    self.selected
  }

  pub fn feed_state(&self) -> &FeedState {
    &self.feed_state
  }

  pub fn screen(&self) -> Screen {
    self.screen
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn trigger_mode(&self) -> TriggerMode {
    self.config.gallery.trigger
  }

  pub fn shows_load_more(&self) -> bool {
    self.trigger_mode() == TriggerMode::Button && self.paginator.state().has_more()
  }

  pub fn shows_sentinel(&self) -> bool {
    self.trigger_mode() == TriggerMode::Infinite && self.paginator.state().has_more()
  }

  pub fn revealed_count(&self) -> usize {
    self.paginator.state().revealed_count()
  }

  pub fn next_batch_size(&self) -> usize {
    self.paginator.state().next_batch_size()
  }

  pub fn total_posts(&self) -> usize {
    self.paginator.state().total()
  }

  /// Tile open in the viewer
  pub fn current_tile(&self) -> Option<&Tile> {
    let index = self.paginator.state().current_index()?;
    self.tiles.get(index)
  }

  pub fn current_post(&self) -> Option<&Post> {
    self.paginator.current()
  }

  pub fn viewer_position(&self) -> Option<(usize, usize)> {
    let index = self.paginator.state().current_index()?;
    Some((index + 1, self.revealed_count()))
  }

  pub fn can_previous(&self) -> bool {
    self.paginator.can_previous()
  }

  pub fn can_next(&self) -> bool {
    self.paginator.can_next()
  }

  pub fn layout(&self) -> GridLayout {
    self.layout
  }

  pub fn set_layout(&mut self, layout: GridLayout) {
    self.layout = layout;
  }

  pub fn title(&self) -> String {
    self
      .config
      .title
      .clone()
      .unwrap_or_else(|| self.source.label())
  }

  pub fn status_message(&self) -> Option<&str> {
    self.status_message.as_deref()
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    let mut crumbs = vec!["Gallery".to_string()];
    if self.screen == Screen::Viewer {
      if let Some(post) = self.current_post() {
        crumbs.push(post.id.clone());
      }
    }
    crumbs
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::SqliteStore;
  use crate::feed::MediaType;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn posts(n: usize) -> Vec<Post> {
    (0..n)
      .map(|i| Post {
        id: format!("p{}", i),
        media_type: MediaType::Image,
        media_url: format!("https://cdn.example/{}.jpg", i),
        permalink: format!("https://www.instagram.com/p/{}/", i),
        caption: None,
        timestamp: None,
        thumbnail_url: None,
        children: Vec::new(),
      })
      .collect()
  }

  fn app(trigger: TriggerMode, page_size: usize) -> App {
    let mut config = Config::default();
    config.gallery.page_size = page_size;
    config.gallery.trigger = trigger;
    config.gallery.verify_media = false;

    let store: Store = Box::new(SqliteStore::open_in_memory(None).unwrap());
    App::new(
      config,
      FeedSource::parse("data/instagram.json").unwrap(),
      store,
    )
    .unwrap()
  }

  fn loaded(app: &mut App, n: usize) {
    app.handle_event(Event::Feed(FeedEvent::Loaded(FeedLoad {
      posts: posts(n),
      total: n,
    })));
  }

  #[tokio::test]
  async fn test_feed_load_reveals_first_batch() {
    let mut app = app(TriggerMode::Button, 4);
    loaded(&mut app, 10);

    assert_eq!(app.feed_state(), &FeedState::Ready);
    assert_eq!(app.tiles().len(), 4);
    assert!(app.shows_load_more());
  }

  #[tokio::test]
  async fn test_empty_feed_message() {
    let mut app = app(TriggerMode::Button, 4);
    app.handle_event(Event::Feed(FeedEvent::Loaded(FeedLoad {
      posts: Vec::new(),
      total: 3,
    })));

    assert_eq!(
      app.feed_state(),
      &FeedState::Empty("No compatible posts found".to_string())
    );
  }

  #[tokio::test]
  async fn test_load_more_control() {
    let mut app = app(TriggerMode::Button, 4);
    loaded(&mut app, 6);

    app.handle_key(key(KeyCode::Char('G')));
    assert_eq!(app.selected(), 4);
    app.handle_key(key(KeyCode::Enter));

    assert_eq!(app.tiles().len(), 6);
    assert!(!app.shows_load_more());
    assert_eq!(app.screen(), Screen::Grid);
  }

  #[tokio::test]
  async fn test_viewer_navigation_stays_in_revealed() {
    let mut app = app(TriggerMode::Button, 3);
    loaded(&mut app, 10);

    app.handle_key(key(KeyCode::Char('l')));
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.screen(), Screen::Viewer);
    assert_eq!(app.viewer_position(), Some((2, 3)));

    app.handle_key(key(KeyCode::Right));
    app.handle_key(key(KeyCode::Right));
    assert_eq!(app.viewer_position(), Some((3, 3)));
    assert!(!app.can_next());

    app.handle_key(key(KeyCode::Esc));
    assert_eq!(app.screen(), Screen::Grid);
    assert_eq!(app.selected(), 2);
  }

  #[tokio::test]
  async fn test_sentinel_reveals_in_infinite_mode() {
    let mut app = app(TriggerMode::Infinite, 4);
    loaded(&mut app, 10);

    // Sentinel row (4 / 2 = 2) is off screen
    app.set_layout(GridLayout {
      columns: 2,
      first_row: 0,
      visible_rows: 2,
    });
    app.handle_event(Event::Tick);
    assert_eq!(app.tiles().len(), 4);

    app.set_layout(GridLayout {
      columns: 2,
      first_row: 1,
      visible_rows: 2,
    });
    app.handle_event(Event::Tick);
    assert_eq!(app.tiles().len(), 8);

    // Repeated ticks keep going until the feed runs out
    app.set_layout(GridLayout {
      columns: 2,
      first_row: 3,
      visible_rows: 2,
    });
    app.handle_event(Event::Tick);
    app.handle_event(Event::Tick);
    assert_eq!(app.tiles().len(), 10);
    assert!(!app.shows_sentinel());
  }

  #[tokio::test]
  async fn test_button_mode_ignores_sentinel() {
    let mut app = app(TriggerMode::Button, 4);
    loaded(&mut app, 10);
    app.set_layout(GridLayout {
      columns: 4,
      first_row: 0,
      visible_rows: 10,
    });

    app.handle_event(Event::Tick);
    assert_eq!(app.tiles().len(), 4);
  }

  #[tokio::test]
  async fn test_media_failure_shows_placeholder_and_evicts() {
    let mut app = app(TriggerMode::Button, 4);
    loaded(&mut app, 2);

    // verify_media is off, so computed URLs were cached on reveal
    assert!(app.paginator.cache().get("p0").is_some());

    app.handle_event(Event::Media(MediaEvent::Failed {
      post_id: "p0".to_string(),
      reason: "HTTP 404".to_string(),
    }));

    assert_eq!(app.tiles()[0].status, MediaStatus::Failed);
    assert_eq!(app.tiles()[0].display_url(), PLACEHOLDER_URL);
    assert!(app.paginator.cache().get("p0").is_none());
    assert_eq!(app.revealed_count(), 2);
  }

  #[tokio::test]
  async fn test_sweep_command() {
    let mut app = app(TriggerMode::Button, 4);
    app.handle_key(key(KeyCode::Char(':')));
    for c in "sweep".chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));

    assert_eq!(app.mode(), &Mode::Normal);
    assert_eq!(
      app.status_message(),
      Some("Cache sweep removed 0 of 0 entries")
    );
  }
}
