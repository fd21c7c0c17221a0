//! Connection settings shared by both HTTP clients.

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_GRAPH_API_VERSION: &str = "v18.0";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  /// Base URL of the pagesync backend.
  pub api_base_url:         String,
  pub graph_api_version:    String,
  /// Overrides the provider URL derived from `graph_api_version`.
  pub graph_api_url:        Option<String>,
  pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      api_base_url:         DEFAULT_API_BASE_URL.to_owned(),
      graph_api_version:    DEFAULT_GRAPH_API_VERSION.to_owned(),
      graph_api_url:        None,
      request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
    }
  }
}

impl ClientConfig {
  /// `https://graph.facebook.com/{version}` unless overridden.
  pub fn graph_url(&self) -> String {
    match &self.graph_api_url {
      Some(url) if !url.trim().is_empty() => url.clone(),
      _ => format!("https://graph.facebook.com/{}", self.graph_api_version),
    }
  }

  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}
