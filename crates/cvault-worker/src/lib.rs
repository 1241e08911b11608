//! Configuration for the session sweep worker.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cvault_google::GoogleConfig;
use cvault_session::SessionConfig;
use serde::Deserialize;

/// Environment variables override the file, e.g.
/// `CVAULT__GOOGLE__CLIENT_SECRET` or `CVAULT__SESSION__MAX_REFRESH_FAILURES`.
pub const ENV_PREFIX: &str = "CVAULT";

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
  pub store_path: PathBuf,
  pub google:     GoogleConfig,
  #[serde(default)]
  pub session:    SessionConfig,
}

impl WorkerConfig {
  /// Read `path` (optional) layered under `CVAULT__*` environment variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let builder = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));
    Self::build(builder)
  }

  fn build(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
  ) -> anyhow::Result<Self> {
    let cfg: Self = builder
      .build()
      .context("failed to read config")?
      .try_deserialize()
      .context("failed to deserialise WorkerConfig")?;
    cfg.session.validate().context("invalid [session] config")?;
    Ok(cfg)
  }

  /// `store_path` with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
