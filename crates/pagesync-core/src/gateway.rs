//! The two external collaborators the orchestrator talks to.
//!
//! [`SearchGateway`] is the provider's own search endpoint (the primary
//! search tier). [`RegistryBackend`] is the system's persistent store for
//! pages and events; it also offers a search passthrough used as the
//! fallback tier. Concrete transports live in `pagesync-client`; tests use
//! in-memory fakes.
//!
//! All methods return `Send` futures so the orchestrator can be driven from a
//! multi-threaded tokio runtime and fetch jobs can be spawned.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  event::Event,
  page::{Page, SearchResult},
  query::{EventPage, EventWindow},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A collaborator call failed. Transport-specific failures are normalised
/// into these kinds so the orchestrator can classify them without knowing
/// about HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
  #[error("credential rejected: {0}")]
  Unauthorized(String),

  #[error("rate limited: {0}")]
  RateLimited(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unexpected status {status}: {message}")]
  Status { status: u16, message: String },

  #[error("transport error: {0}")]
  Transport(String),

  #[error("malformed response: {0}")]
  Decode(String),

  #[error("timed out after {0:?}")]
  Timeout(Duration),
}

// ─── Fetch acceptance ────────────────────────────────────────────────────────

/// The backend's answer to a fetch trigger. This is an acknowledgement, not
/// the fetched events themselves; those are read back through
/// [`RegistryBackend::query_events`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobAcceptance {
  Accepted {
    events_fetched: Option<u64>,
    message:        Option<String>,
  },
  Rejected {
    reason: String,
  },
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// The provider's page search endpoint.
pub trait SearchGateway: Send + Sync {
  /// Search for pages matching `query`, requesting the given field
  /// projection. Auth failures, rate limits and network failures all
  /// surface as `Err`.
  fn search<'a>(
    &'a self,
    query: &'a str,
    credential: &'a str,
    fields: &'a [&'a str],
  ) -> impl Future<Output = Result<Vec<SearchResult>, GatewayError>> + Send + 'a;
}

/// The system's own persistent store for pages and events.
///
/// Schema ownership is the backend's. In particular, deleting a page is
/// expected to cascade to that page's events.
pub trait RegistryBackend: Send + Sync {
  // ── Search ────────────────────────────────────────────────────────────

  /// Server-side page search, used when the direct provider call fails.
  fn search_passthrough<'a>(
    &'a self,
    query: &'a str,
    credential: &'a str,
  ) -> impl Future<Output = Result<Vec<SearchResult>, GatewayError>> + Send + 'a;

  // ── Pages ─────────────────────────────────────────────────────────────

  fn list_pages(
    &self,
  ) -> impl Future<Output = Result<Vec<Page>, GatewayError>> + Send + '_;

  /// Persist a page. A backend that enforces uniqueness itself answers a
  /// duplicate with [`GatewayError::Conflict`].
  fn create_page<'a>(
    &'a self,
    page: &'a Page,
  ) -> impl Future<Output = Result<Page, GatewayError>> + Send + 'a;

  /// Delete a page and its events. Untracked ids yield
  /// [`GatewayError::NotFound`].
  fn delete_page<'a>(
    &'a self,
    page_id: &'a str,
  ) -> impl Future<Output = Result<(), GatewayError>> + Send + 'a;

  /// Ask the backend to pull events for `page_id` from the provider.
  fn trigger_fetch<'a>(
    &'a self,
    page_id: &'a str,
  ) -> impl Future<Output = Result<JobAcceptance, GatewayError>> + Send + 'a;

  // ── Events ────────────────────────────────────────────────────────────

  /// Return one window of the matching events plus the size of the whole
  /// matching set.
  fn query_events<'a>(
    &'a self,
    window: &'a EventWindow,
  ) -> impl Future<Output = Result<EventPage, GatewayError>> + Send + 'a;

  /// Retrieve one event by id. Returns `None` if not found.
  fn get_event<'a>(
    &'a self,
    event_id: &'a str,
  ) -> impl Future<Output = Result<Option<Event>, GatewayError>> + Send + 'a;
}
