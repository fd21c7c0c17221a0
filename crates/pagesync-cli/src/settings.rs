//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `PAGESYNC_*` environment variables. Command-line flags are applied
//! on top by the caller.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use config::{Config, Environment, File, Source};
use pagesync_client::{
  ClientConfig,
  config::{DEFAULT_API_BASE_URL, DEFAULT_GRAPH_API_VERSION, DEFAULT_REQUEST_TIMEOUT_SECS},
};
use pagesync_core::{fetch::DEFAULT_FETCH_TIMEOUT, query::DEFAULT_PAGE_SIZE};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "pagesync.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub api_base_url:          String,
  pub graph_api_version:     String,
  pub graph_api_url:         Option<String>,
  /// Provider access token used for searches.
  pub access_token:          Option<String>,
  pub request_timeout_secs:  u64,
  pub fetch_timeout_secs:    u64,
  pub events_per_page:       u32,
  pub refresh_interval_secs: u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      api_base_url:          DEFAULT_API_BASE_URL.to_owned(),
      graph_api_version:     DEFAULT_GRAPH_API_VERSION.to_owned(),
      graph_api_url:         None,
      access_token:          None,
      request_timeout_secs:  DEFAULT_REQUEST_TIMEOUT_SECS,
      fetch_timeout_secs:    DEFAULT_FETCH_TIMEOUT.as_secs(),
      events_per_page:       DEFAULT_PAGE_SIZE,
      refresh_interval_secs: 60,
    }
  }
}

impl Settings {
  /// Load settings. An explicitly named file must exist; the default
  /// `pagesync.toml` is optional.
  pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
    let required = path.is_some();
    let file = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);

    Self::assemble(
      File::from(file.clone()).required(required),
      Environment::with_prefix("PAGESYNC").try_parsing(true),
    )
    .with_context(|| format!("failed to load configuration from {}", file.display()))
  }

  fn assemble<F>(file: F, env: Environment) -> Result<Self, config::ConfigError>
  where
    F: Source + Send + Sync + 'static,
  {
    Config::builder()
      .add_source(file)
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  pub fn client_config(&self) -> ClientConfig {
    ClientConfig {
      api_base_url:         self.api_base_url.clone(),
      graph_api_version:    self.graph_api_version.clone(),
      graph_api_url:        self.graph_api_url.clone(),
      request_timeout_secs: self.request_timeout_secs,
    }
  }

  pub fn fetch_timeout(&self) -> Duration { Duration::from_secs(self.fetch_timeout_secs) }

  pub fn refresh_interval(&self) -> Duration {
    Duration::from_secs(self.refresh_interval_secs.max(1))
  }
}
