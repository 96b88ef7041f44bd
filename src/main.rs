mod app;
mod cache;
mod commands;
mod config;
mod event;
mod feed;
mod gallery;
mod logging;
mod ui;

use cache::{KeyValueStore, MediaCache, NoopStore, SqliteStore};
use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "feedgrid")]
#[command(about = "A paginated terminal gallery for Instagram-style media feeds")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/feedgrid/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Feed document to show: a JSON file path or an http(s) URL
  #[arg(short, long)]
  feed: Option<String>,

  /// Posts revealed per batch
  #[arg(short = 'n', long)]
  page_size: Option<usize>,

  /// Reveal batches on scroll instead of with a load-more control
  #[arg(long)]
  infinite: bool,

  /// Don't read or write the media cache
  #[arg(long)]
  no_cache: bool,

  /// Remove expired and corrupted cache entries, then exit
  #[arg(long)]
  sweep_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration, then apply command line overrides
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(feed) = args.feed {
    config.feed.source = Some(feed);
  }
  if let Some(page_size) = args.page_size {
    config.gallery.page_size = page_size;
  }
  if args.infinite {
    config.gallery.trigger = config::TriggerMode::Infinite;
  }
  if args.no_cache {
    config.cache.enabled = false;
  }
  config.validate()?;

  let _log_guard = logging::init(&config::data_dir()?.join("logs"))?;

  let store: app::Store = if config.cache.enabled {
    Box::new(SqliteStore::open(
      config.cache.path.as_deref(),
      config.cache.max_entries,
    )?)
  } else {
    Box::new(NoopStore)
  };

  if args.sweep_cache {
    return sweep(store);
  }

  let source = config.feed_source()?;
  info!(feed = %source.label(), "Starting");

  // Initialize and run the app
  let mut app = app::App::new(config, source, store)?;
  app.run().await?;

  Ok(())
}

fn sweep(store: Box<dyn KeyValueStore>) -> Result<()> {
  let report = MediaCache::new(store).sweep();
  info!(?report, "Cache swept");
  println!(
    "Scanned {} cache entries: removed {} expired, {} corrupted",
    report.scanned, report.expired, report.corrupted
  );
  Ok(())
}
