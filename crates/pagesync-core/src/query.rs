//! Paginated, filterable reads over the event store.
//!
//! Callers describe what they want with a request-scoped [`EventQuery`]
//! (1-based page number). [`EventQueryService`] turns it into an
//! offset/limit [`EventWindow`] for the backend and returns one page of
//! events plus the size of the whole matching set.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, event::Event, gateway::RegistryBackend};

/// Events shown per page when the caller does not say otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

// ─── Request types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
  /// 1-based.
  pub page_number:    u32,
  pub page_size:      u32,
  /// Free-text filter. Combined with `page_id_filter` by logical AND.
  pub search_text:    Option<String>,
  pub page_id_filter: Option<String>,
}

impl Default for EventQuery {
  fn default() -> Self {
    Self {
      page_number:    1,
      page_size:      DEFAULT_PAGE_SIZE,
      search_text:    None,
      page_id_filter: None,
    }
  }
}

impl EventQuery {
  pub fn new(page_number: u32, page_size: u32) -> Self {
    Self {
      page_number,
      page_size,
      ..Self::default()
    }
  }

  /// First page of events belonging to `page_id`.
  pub fn for_page(page_id: impl Into<String>) -> Self {
    Self::default().with_page_id(page_id)
  }

  pub fn with_search(mut self, text: impl Into<String>) -> Self {
    self.search_text = Some(text.into());
    self
  }

  pub fn with_page_id(mut self, page_id: impl Into<String>) -> Self {
    self.page_id_filter = Some(page_id.into());
    self
  }

  /// Validate and convert to the backend's offset/limit convention.
  ///
  /// `offset = (page_number - 1) * page_size`. Blank filters are dropped.
  pub fn window(&self) -> Result<EventWindow> {
    if self.page_number < 1 {
      return Err(Error::invalid("page_number must be at least 1"));
    }
    if self.page_size < 1 {
      return Err(Error::invalid("page_size must be at least 1"));
    }

    Ok(EventWindow {
      offset:      u64::from(self.page_number - 1) * u64::from(self.page_size),
      limit:       self.page_size,
      search_text: non_blank(self.search_text.as_deref()),
      page_id:     non_blank(self.page_id_filter.as_deref()),
    })
  }
}

fn non_blank(s: Option<&str>) -> Option<String> {
  s.filter(|s| !s.trim().is_empty()).map(str::to_owned)
}

/// What the backend is actually asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindow {
  pub offset:      u64,
  pub limit:       u32,
  pub search_text: Option<String>,
  pub page_id:     Option<String>,
}

// ─── Response ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventPage {
  pub items: Vec<Event>,
  /// Size of the full matching set, irrespective of the page size.
  pub total: u64,
}

impl EventPage {
  /// Number of pages needed to show `total` events at `page_size` per page.
  pub fn page_count(&self, page_size: u32) -> u64 {
    if page_size == 0 {
      return 0;
    }
    self.total.div_ceil(u64::from(page_size))
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Stateless: every call is a fresh backend query, and result order is
/// whatever the backend imposes.
pub struct EventQueryService<B> {
  backend: Arc<B>,
}

impl<B: RegistryBackend> EventQueryService<B> {
  pub fn new(backend: Arc<B>) -> Self { Self { backend } }

  pub async fn query_events(&self, query: &EventQuery) -> Result<EventPage> {
    let window = query.window()?;
    tracing::debug!(
      offset = window.offset,
      limit = window.limit,
      search = ?window.search_text,
      page_id = ?window.page_id,
      "querying events"
    );
    self
      .backend
      .query_events(&window)
      .await
      .map_err(|cause| Error::RegistryUnavailable { cause })
  }

  pub async fn get_event(&self, event_id: &str) -> Result<Event> {
    if event_id.trim().is_empty() {
      return Err(Error::invalid("event id must not be empty"));
    }
    self
      .backend
      .get_event(event_id)
      .await
      .map_err(|cause| Error::RegistryUnavailable { cause })?
      .ok_or_else(|| Error::NotFound(format!("event {event_id}")))
  }
}
