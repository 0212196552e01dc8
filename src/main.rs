mod api;
mod app;
mod cache;
mod commands;
mod config;
mod error;
mod event;
mod filter;
mod logging;
mod query;
mod session;
mod store;
mod ui;
mod validation;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::cache::QueryCache;
use crate::session::{Credential, KeyValueStore, MemoryStore, SessionStore, SqliteStore};
use crate::store::TaskStore;

#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(about = "A terminal client for a personal todo list service")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/taskdeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the todo service, e.g. http://localhost:8080/api
  #[arg(short, long)]
  server: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override server if specified on command line
  if let Some(server) = args.server {
    config.server.url = server;
  }

  let data_dir = config.data_dir()?;
  let _log_guard = logging::init(&data_dir, config.log_level.as_deref())?;
  info!(server = %config.server.url, data_dir = %data_dir.display(), "starting taskdeck");

  let credential = Credential::default();
  let gateway = Arc::new(ApiClient::new(&config.server.url, credential.clone())?);
  info!(base = %gateway.base_url(), "gateway ready");
  let storage: Arc<dyn KeyValueStore> = match SqliteStore::open(&data_dir) {
    Ok(store) => Arc::new(store),
    Err(e) => {
      warn!(error = %e, "session storage unavailable, logins will not survive a restart");
      Arc::new(MemoryStore::new())
    }
  };
  let cache = QueryCache::new()
    .with_stale_time(config.stale_time())
    .with_retry(config.cache.retry);

  let session = SessionStore::new(gateway.clone(), storage, credential, cache.clone());
  let store = TaskStore::new(gateway, cache, session);

  // Initialize and run the app
  let mut app = app::App::new(config, store);
  app.run().await?;

  info!("exiting");
  Ok(())
}
