//! In-memory fakes of both collaborators for orchestrator tests.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Semaphore;

use crate::{
  event::Event,
  gateway::{GatewayError, JobAcceptance, RegistryBackend, SearchGateway},
  page::{Page, SearchResult},
  query::{EventPage, EventWindow},
};

pub fn result(id: &str, name: &str) -> SearchResult {
  SearchResult {
    id:          id.into(),
    name:        name.into(),
    category:    Some("Cafe".into()),
    link:        Some(format!("https://facebook.com/{id}")),
    picture_url: None,
  }
}

fn base_time() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap() }

/// An event starting `hours` after a fixed base time.
pub fn event(id: &str, page_id: &str, name: &str, hours: i64) -> Event {
  Event {
    id:          id.into(),
    page_id:     page_id.into(),
    page_name:   None,
    name:        name.into(),
    start_time:  base_time() + Duration::hours(hours),
    location:    None,
    is_canceled: false,
  }
}

// ─── Search gateway ──────────────────────────────────────────────────────────

pub struct FakeGraph {
  response:        Mutex<Result<Vec<SearchResult>, GatewayError>>,
  pub calls:       AtomicUsize,
  pub last_fields: Mutex<Vec<String>>,
}

impl FakeGraph {
  pub fn returning(results: Vec<SearchResult>) -> Self {
    Self {
      response:    Mutex::new(Ok(results)),
      calls:       AtomicUsize::new(0),
      last_fields: Mutex::new(Vec::new()),
    }
  }

  pub fn failing(err: GatewayError) -> Self {
    let graph = Self::returning(Vec::new());
    *graph.response.lock().unwrap() = Err(err);
    graph
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl SearchGateway for FakeGraph {
  async fn search(
    &self,
    _query: &str,
    _credential: &str,
    fields: &[&str],
  ) -> Result<Vec<SearchResult>, GatewayError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    *self.last_fields.lock().unwrap() = fields.iter().map(|f| f.to_string()).collect();
    self.response.lock().unwrap().clone()
  }
}

// ─── Registry backend ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeBackend {
  pages:            Mutex<Vec<Page>>,
  events:           Mutex<Vec<Event>>,
  /// Events "discovered" on the next fetch for a page.
  planned:          Mutex<HashMap<String, Vec<Event>>>,
  search_response:  Mutex<Option<Result<Vec<SearchResult>, GatewayError>>>,
  pub list_error:   Mutex<Option<GatewayError>>,
  /// When set, `list_pages` answers with this instead of the real pages.
  pub stale_list:   Mutex<Option<Vec<Page>>>,
  pub write_error:  Mutex<Option<GatewayError>>,
  pub fetch_error:  Mutex<Option<GatewayError>>,
  pub query_error:  Mutex<Option<GatewayError>>,
  /// Answer duplicate creates with `Conflict` instead of storing them.
  pub unique_pages: bool,
  /// When set, `trigger_fetch` blocks until a permit is added.
  gate:             Option<Semaphore>,
  search_calls:     AtomicUsize,
  create_calls:     AtomicUsize,
  fetch_calls:      AtomicUsize,
  query_calls:      AtomicUsize,
}

impl FakeBackend {
  pub fn new() -> Self { Self::default() }

  pub fn with_pages(self, pages: &[(&str, &str)]) -> Self {
    *self.pages.lock().unwrap() = pages
      .iter()
      .map(|(id, name)| result(id, name).to_page())
      .collect();
    self
  }

  pub fn with_events(self, events: Vec<Event>) -> Self {
    *self.events.lock().unwrap() = events;
    self
  }

  pub fn with_search(self, response: Result<Vec<SearchResult>, GatewayError>) -> Self {
    *self.search_response.lock().unwrap() = Some(response);
    self
  }

  pub fn gated(mut self) -> Self {
    self.gate = Some(Semaphore::new(0));
    self
  }

  pub fn unique(mut self) -> Self {
    self.unique_pages = true;
    self
  }

  pub fn plan_fetch(&self, page_id: &str, events: Vec<Event>) {
    self.planned.lock().unwrap().insert(page_id.into(), events);
  }

  /// Let `n` gated fetches proceed.
  pub fn release(&self, n: usize) {
    if let Some(gate) = &self.gate {
      gate.add_permits(n);
    }
  }

  pub fn page_ids(&self) -> Vec<String> {
    self.pages.lock().unwrap().iter().map(|p| p.page_id.clone()).collect()
  }

  pub fn search_calls(&self) -> usize { self.search_calls.load(Ordering::SeqCst) }

  pub fn create_calls(&self) -> usize { self.create_calls.load(Ordering::SeqCst) }

  pub fn fetch_calls(&self) -> usize { self.fetch_calls.load(Ordering::SeqCst) }

  pub fn query_calls(&self) -> usize { self.query_calls.load(Ordering::SeqCst) }
}

impl RegistryBackend for FakeBackend {
  async fn search_passthrough(
    &self,
    _query: &str,
    _credential: &str,
  ) -> Result<Vec<SearchResult>, GatewayError> {
    self.search_calls.fetch_add(1, Ordering::SeqCst);
    self
      .search_response
      .lock()
      .unwrap()
      .clone()
      .unwrap_or_else(|| Ok(Vec::new()))
  }

  async fn list_pages(&self) -> Result<Vec<Page>, GatewayError> {
    if let Some(err) = self.list_error.lock().unwrap().clone() {
      return Err(err);
    }
    if let Some(stale) = self.stale_list.lock().unwrap().clone() {
      return Ok(stale);
    }
    Ok(self.pages.lock().unwrap().clone())
  }

  async fn create_page(&self, page: &Page) -> Result<Page, GatewayError> {
    self.create_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(err) = self.write_error.lock().unwrap().clone() {
      return Err(err);
    }
    let mut pages = self.pages.lock().unwrap();
    if self.unique_pages && pages.iter().any(|p| p.page_id == page.page_id) {
      return Err(GatewayError::Conflict(format!("page {} exists", page.page_id)));
    }
    pages.push(page.clone());
    Ok(page.clone())
  }

  async fn delete_page(&self, page_id: &str) -> Result<(), GatewayError> {
    if let Some(err) = self.write_error.lock().unwrap().clone() {
      return Err(err);
    }
    let mut pages = self.pages.lock().unwrap();
    let before = pages.len();
    pages.retain(|p| p.page_id != page_id);
    if pages.len() == before {
      return Err(GatewayError::NotFound(format!("page {page_id}")));
    }
    self.events.lock().unwrap().retain(|e| e.page_id != page_id);
    Ok(())
  }

  async fn trigger_fetch(&self, page_id: &str) -> Result<JobAcceptance, GatewayError> {
    self.fetch_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(gate) = &self.gate {
      gate
        .acquire()
        .await
        .map_err(|e| GatewayError::Transport(e.to_string()))?
        .forget();
    }
    if let Some(err) = self.fetch_error.lock().unwrap().clone() {
      return Err(err);
    }

    let fresh = self.planned.lock().unwrap().remove(page_id).unwrap_or_default();
    let count = fresh.len() as u64;
    let mut events = self.events.lock().unwrap();
    for ev in fresh {
      events.retain(|e| e.id != ev.id);
      events.push(ev);
    }
    Ok(JobAcceptance::Accepted {
      events_fetched: Some(count),
      message:        None,
    })
  }

  async fn query_events(&self, window: &EventWindow) -> Result<EventPage, GatewayError> {
    self.query_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(err) = self.query_error.lock().unwrap().clone() {
      return Err(err);
    }

    let mut matching: Vec<Event> = self
      .events
      .lock()
      .unwrap()
      .iter()
      .filter(|e| window.page_id.as_deref().is_none_or(|id| e.page_id == id))
      .filter(|e| {
        window.search_text.as_deref().is_none_or(|t| {
          e.name.to_lowercase().contains(&t.to_lowercase())
        })
      })
      .cloned()
      .collect();
    matching.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));

    let total = matching.len() as u64;
    let items = matching
      .into_iter()
      .skip(window.offset as usize)
      .take(window.limit as usize)
      .collect();
    Ok(EventPage { items, total })
  }

  async fn get_event(&self, event_id: &str) -> Result<Option<Event>, GatewayError> {
    Ok(self.events.lock().unwrap().iter().find(|e| e.id == event_id).cloned())
  }
}
