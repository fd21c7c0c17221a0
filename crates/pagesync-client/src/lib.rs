//! HTTP implementations of the pagesync collaborators.
//!
//! - [`GraphClient`] calls the provider's page search directly and is the
//!   primary search tier.
//! - [`BackendClient`] talks to the pagesync backend: the tracked-page
//!   registry, fetch triggers, the event store, and the search passthrough
//!   used as the fallback tier.
//!
//! Both are cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
//!
//! ```rust,ignore
//! let cfg = ClientConfig::default();
//! let orch = Orchestrator::new(
//!   Arc::new(GraphClient::new(&cfg)?),
//!   Arc::new(BackendClient::new(&cfg)?),
//! );
//! ```

pub mod backend;
pub mod config;
pub mod graph;
mod wire;

use std::time::Duration;

use pagesync_core::gateway::GatewayError;
use reqwest::{Client, Url};

pub use backend::BackendClient;
pub use config::ClientConfig;
pub use graph::GraphClient;

fn build_http(timeout: Duration) -> Result<Client, GatewayError> {
  Client::builder()
    .timeout(timeout)
    .build()
    .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))
}

fn parse_base(raw: &str) -> Result<Url, GatewayError> {
  let url = Url::parse(raw)
    .map_err(|e| GatewayError::Transport(format!("invalid base URL {raw:?}: {e}")))?;
  if url.cannot_be_a_base() {
    return Err(GatewayError::Transport(format!("invalid base URL {raw:?}")));
  }
  Ok(url)
}

/// Append path segments to `base`. An empty final segment yields a trailing
/// slash. Segments are percent-encoded.
fn join(base: &Url, segments: &[&str]) -> Url {
  let mut url = base.clone();
  if let Ok(mut path) = url.path_segments_mut() {
    path.pop_if_empty().extend(segments);
  }
  url
}
