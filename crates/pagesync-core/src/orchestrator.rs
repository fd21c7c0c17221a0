//! [`Orchestrator`]: one entry point over the four components.
//!
//! Search results feed [`add_page`](Orchestrator::add_page); tracked pages
//! feed [`fetch_events`](Orchestrator::fetch_events); what the fetch jobs
//! persist is read back with [`query_events`](Orchestrator::query_events).
//! No state is shared between calls other than the registry's local view
//! and the fetch job table.

use std::{sync::Arc, time::Duration};

use crate::{
  Result,
  event::Event,
  fetch::{FetchCoordinator, FetchJob, JobState},
  gateway::{RegistryBackend, SearchGateway},
  page::{Page, SearchResult},
  query::{EventPage, EventQuery, EventQueryService},
  registry::{AddOutcome, PageRegistry},
  search::SearchOrchestrator,
};

pub struct Orchestrator<G, B> {
  search:   SearchOrchestrator<G, B>,
  registry: PageRegistry<B>,
  fetch:    FetchCoordinator<B>,
  events:   EventQueryService<B>,
}

impl<G, B> Orchestrator<G, B>
where
  G: SearchGateway,
  B: RegistryBackend + 'static,
{
  pub fn new(gateway: Arc<G>, backend: Arc<B>) -> Self {
    Self {
      search:   SearchOrchestrator::new(gateway, Arc::clone(&backend)),
      registry: PageRegistry::new(Arc::clone(&backend)),
      fetch:    FetchCoordinator::new(Arc::clone(&backend)),
      events:   EventQueryService::new(backend),
    }
  }

  /// Bound every backend fetch trigger by `timeout`.
  pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
    self.fetch = self.fetch.with_timeout(timeout);
    self
  }

  pub fn search_orchestrator(&self) -> &SearchOrchestrator<G, B> { &self.search }

  pub fn registry(&self) -> &PageRegistry<B> { &self.registry }

  pub fn coordinator(&self) -> &FetchCoordinator<B> { &self.fetch }

  pub fn event_service(&self) -> &EventQueryService<B> { &self.events }

  // ── Search ────────────────────────────────────────────────────────────

  pub async fn search(
    &self,
    query: &str,
    credential: &str,
  ) -> Result<Vec<SearchResult>> {
    self.search.search(query, credential).await
  }

  // ── Registry ──────────────────────────────────────────────────────────

  pub async fn list_pages(&self) -> Result<Vec<Page>> { self.registry.list().await }

  pub async fn add_page(&self, candidate: &SearchResult) -> Result<AddOutcome> {
    self.registry.add(candidate).await
  }

  /// Stop tracking a page and forget its last finished fetch job.
  pub async fn remove_page(&self, page_id: &str) -> Result<()> {
    self.registry.remove(page_id).await?;
    self.fetch.forget(page_id).await;
    Ok(())
  }

  // ── Fetching ──────────────────────────────────────────────────────────

  pub async fn fetch_events(&self, page_id: &str) -> Result<FetchJob> {
    self.fetch.fetch_events(page_id).await
  }

  /// Start (or join) one fetch job per tracked page.
  pub async fn fetch_all(&self) -> Result<Vec<FetchJob>> {
    let pages = self.registry.list().await?;
    let mut jobs = Vec::with_capacity(pages.len());
    for page in &pages {
      jobs.push(self.fetch.fetch_events(&page.page_id).await?);
    }
    Ok(jobs)
  }

  pub async fn job_state(&self, page_id: &str) -> JobState {
    self.fetch.state(page_id).await
  }

  // ── Events ────────────────────────────────────────────────────────────

  pub async fn query_events(&self, query: &EventQuery) -> Result<EventPage> {
    self.events.query_events(query).await
  }

  pub async fn get_event(&self, event_id: &str) -> Result<Event> {
    self.events.get_event(event_id).await
  }
}
