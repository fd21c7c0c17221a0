//! [`BackendClient`] for the pagesync backend's JSON API.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/pages/search` | `?q&access_token`; search passthrough |
//! | `GET`    | `/pages/` | tracked pages |
//! | `POST`   | `/pages/` | body: page; 409 if already tracked |
//! | `DELETE` | `/pages/{id}` | cascades to events; 404 if untracked |
//! | `POST`   | `/pages/{id}/fetch` | pull events from the provider; 409 if refused |
//! | `GET`    | `/events/` | `?page&limit[&page_id][&search]` → `{data, total}` |
//! | `GET`    | `/events/{id}` | 404 if unknown |

use std::time::Duration;

use pagesync_core::{
  event::Event,
  gateway::{GatewayError, JobAcceptance, RegistryBackend},
  page::{Page, SearchResult},
  query::{EventPage, EventWindow},
};
use reqwest::{Client, StatusCode, Url};

use crate::{
  ClientConfig, build_http, join, parse_base,
  wire::{self, EventsEnvelope, SearchPayload},
};

#[derive(Clone)]
pub struct BackendClient {
  client:  Client,
  base:    Url,
  timeout: Duration,
}

impl BackendClient {
  pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
    let timeout = config.request_timeout();
    Ok(Self {
      client: build_http(timeout)?,
      base: parse_base(&config.api_base_url)?,
      timeout,
    })
  }

  fn url(&self, segments: &[&str]) -> Url { join(&self.base, segments) }

  async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, GatewayError> {
    req.send().await.map_err(|e| wire::transport(e, self.timeout))
  }

  /// One backend page of events, sized by the window's limit.
  async fn events_page(
    &self,
    window: &EventWindow,
    page: u64,
  ) -> Result<EventsEnvelope, GatewayError> {
    let mut params: Vec<(&str, String)> = vec![
      ("page", page.to_string()),
      ("limit", window.limit.to_string()),
    ];
    if let Some(page_id) = &window.page_id {
      params.push(("page_id", page_id.clone()));
    }
    if let Some(text) = &window.search_text {
      params.push(("search", text.clone()));
    }

    let resp = self
      .send(self.client.get(self.url(&["events", ""])).query(&params))
      .await?;
    wire::read_json(resp, "events", self.timeout).await
  }
}

/// The backend pages events with a 1-based page number rather than an
/// offset. Returns the backend page holding `offset` and how many of its
/// leading rows fall before the window.
fn backend_span(window: &EventWindow) -> (u64, usize) {
  let limit = u64::from(window.limit.max(1));
  let skip = usize::try_from(window.offset % limit).unwrap_or(usize::MAX);
  (window.offset / limit + 1, skip)
}

impl RegistryBackend for BackendClient {
  // ── Search ──────────────────────────────────────────────────────────────

  async fn search_passthrough(
    &self,
    query: &str,
    credential: &str,
  ) -> Result<Vec<SearchResult>, GatewayError> {
    let url = self.url(&["pages", "search"]);
    tracing::debug!(%url, query, "backend search passthrough");

    let resp = self
      .send(
        self
          .client
          .get(url)
          .query(&[("q", query), ("access_token", credential)]),
      )
      .await?;
    let payload: SearchPayload = wire::read_json(resp, "backend search", self.timeout).await?;
    Ok(payload.into_results())
  }

  // ── Pages ───────────────────────────────────────────────────────────────

  async fn list_pages(&self) -> Result<Vec<Page>, GatewayError> {
    let resp = self.send(self.client.get(self.url(&["pages", ""]))).await?;
    wire::read_json(resp, "pages", self.timeout).await
  }

  async fn create_page(&self, page: &Page) -> Result<Page, GatewayError> {
    let resp = self
      .send(self.client.post(self.url(&["pages", ""])).json(page))
      .await?;
    wire::read_json(resp, "created page", self.timeout).await
  }

  async fn delete_page(&self, page_id: &str) -> Result<(), GatewayError> {
    let resp = self
      .send(self.client.delete(self.url(&["pages", page_id])))
      .await?;
    wire::read_body(resp, self.timeout).await?;
    Ok(())
  }

  async fn trigger_fetch(&self, page_id: &str) -> Result<JobAcceptance, GatewayError> {
    let url = self.url(&["pages", page_id, "fetch"]);
    tracing::debug!(%url, "triggering event fetch");

    let resp = self.send(self.client.post(url)).await?;
    match wire::read_body(resp, self.timeout).await {
      Ok(body) => Ok(wire::acceptance_from_body(&body)),
      Err(GatewayError::Conflict(reason)) => Ok(JobAcceptance::Rejected { reason }),
      Err(e) => Err(e),
    }
  }

  // ── Events ──────────────────────────────────────────────────────────────

  async fn query_events(&self, window: &EventWindow) -> Result<EventPage, GatewayError> {
    let (page, skip) = backend_span(window);
    let limit = u64::from(window.limit.max(1));

    let first = self.events_page(window, page).await?;
    let total = first.total;
    let mut items = first.data;
    // A window off a page boundary straddles two backend pages.
    if skip > 0 && total > page.saturating_mul(limit) {
      items.extend(self.events_page(window, page + 1).await?.data);
    }

    Ok(EventPage {
      items: items
        .into_iter()
        .skip(skip)
        .take(window.limit as usize)
        .collect(),
      total,
    })
  }

  async fn get_event(&self, event_id: &str) -> Result<Option<Event>, GatewayError> {
    let resp = self
      .send(self.client.get(self.url(&["events", event_id])))
      .await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    wire::read_json(resp, "event", self.timeout).await.map(Some)
  }
}
