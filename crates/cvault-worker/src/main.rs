//! cvault-worker binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and runs the token refresh and storage quota sweeps until SIGINT or
//! SIGTERM.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use cvault_google::GoogleProvider;
use cvault_session::{SessionManager, SweepScheduler};
use cvault_store_sqlite::SqliteStore;
use cvault_worker::WorkerConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "cvault session sweep worker")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run a single sweep tick, print its report as JSON, and exit.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = WorkerConfig::load(&cli.config)?;

  let store_path = cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let provider = GoogleProvider::new(cfg.google.clone())
    .context("failed to build Google client")?;

  let manager = Arc::new(SessionManager::new(
    Arc::new(store),
    Arc::new(provider),
    cfg.session.clone(),
  ));
  let mut scheduler = SweepScheduler::new(manager);

  if cli.once {
    let report = scheduler.tick().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  let mut handle = scheduler.spawn();
  let stopped = tokio::select! {
    _ = shutdown_signal() => None,
    result = handle.stopped() => Some(result),
  };

  match stopped {
    None => {
      tracing::info!("shutdown requested; waiting for the current sweep");
      handle.shutdown().await;
      Ok(())
    }
    Some(result) => {
      let reason = match result {
        Ok(()) => "exited".to_owned(),
        Err(e) => e.to_string(),
      };
      tracing::error!(%reason, "session sweep scheduler stopped unexpectedly");
      anyhow::bail!("session sweep scheduler stopped unexpectedly: {reason}")
    }
  }
}

#[cfg(unix)]
async fn shutdown_signal() {
  use tokio::signal::unix::{SignalKind, signal};

  match signal(SignalKind::terminate()) {
    Ok(mut sigterm) => {
      tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
      }
    }
    Err(e) => {
      tracing::warn!(error = %e, "failed to install SIGTERM handler");
      let _ = tokio::signal::ctrl_c().await;
    }
  }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
  let _ = tokio::signal::ctrl_c().await;
}
