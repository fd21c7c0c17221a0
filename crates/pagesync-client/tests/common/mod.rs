//! An axum stand-in for the pagesync backend and the provider's search,
//! served on an ephemeral local port.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/graph/search` | provider search; 400 + OAuth error on bad token |
//! | `GET`    | `/pages/search` | passthrough; 401 on bad token |
//! | `GET`    | `/pages/` | |
//! | `POST`   | `/pages/` | 409 on duplicate |
//! | `DELETE` | `/pages/{id}` | cascades to events |
//! | `POST`   | `/pages/{id}/fetch` | moves planned events into the store |
//! | `GET`    | `/events/` | `page`/`limit`/`page_id`/`search` |
//! | `GET`    | `/events/{id}` | |

#![allow(dead_code)]

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use axum::{
  Json, Router,
  extract::{Path, Query, State},
  http::StatusCode,
  routing::{delete, get, post},
};
use chrono::{Duration, TimeZone, Utc};
use pagesync_client::ClientConfig;
use pagesync_core::{event::Event, page::Page};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const GRAPH_TOKEN: &str = "graph-token";
pub const BACKEND_TOKEN: &str = "backend-token";

type Reply<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

fn reject(status: StatusCode, body: Value) -> (StatusCode, Json<Value>) {
  (status, Json(body))
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubState {
  pub pages:         Mutex<Vec<Page>>,
  pub events:        Mutex<Vec<Event>>,
  pub planned:       Mutex<HashMap<String, Vec<Event>>>,
  /// Pages the provider "knows about", in provider order.
  pub directory:     Vec<(String, String)>,
  pub graph_hits:    AtomicUsize,
  pub fallback_hits: AtomicUsize,
  pub fetch_hits:    AtomicUsize,
  pub last_fields:   Mutex<Option<String>>,
  /// Answer `GET /events/` without the `total` field.
  pub omit_total:    AtomicBool,
}

impl StubState {
  pub fn with_directory(names: &[(&str, &str)]) -> Self {
    Self {
      directory: names
        .iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect(),
      ..Self::default()
    }
  }

  pub fn track(&self, page_id: &str, name: &str) {
    self.pages.lock().unwrap().push(Page {
      page_id:  page_id.into(),
      name:     name.into(),
      category: None,
      url:      None,
    });
  }

  pub fn plan_fetch(&self, page_id: &str, events: Vec<Event>) {
    self.planned.lock().unwrap().insert(page_id.into(), events);
  }

  pub fn hits(counter: &AtomicUsize) -> usize { counter.load(Ordering::SeqCst) }
}

pub fn event(id: &str, page_id: &str, name: &str, hours: i64) -> Event {
  Event {
    id:          id.into(),
    page_id:     page_id.into(),
    page_name:   None,
    name:        name.into(),
    start_time:  Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap() + Duration::hours(hours),
    location:    Some("Main St".into()),
    is_canceled: false,
  }
}

// ─── Server ──────────────────────────────────────────────────────────────────

pub struct Stub {
  pub base_url: String,
  pub state:    Arc<StubState>,
}

impl Stub {
  /// Client settings pointing both tiers at this stub.
  pub fn config(&self) -> ClientConfig {
    ClientConfig {
      api_base_url: self.base_url.clone(),
      graph_api_url: Some(format!("{}/graph", self.base_url)),
      request_timeout_secs: 5,
      ..ClientConfig::default()
    }
  }
}

pub async fn spawn(state: StubState) -> Stub {
  let state = Arc::new(state);
  let app = router(Arc::clone(&state));
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });
  Stub {
    base_url: format!("http://{addr}"),
    state,
  }
}

fn router(state: Arc<StubState>) -> Router<()> {
  Router::new()
    .route("/graph/search", get(graph_search))
    .route("/pages/search", get(passthrough_search))
    .route("/pages/", get(list_pages).post(create_page))
    .route("/pages/{id}", delete(delete_page))
    .route("/pages/{id}/fetch", post(fetch_page))
    .route("/events/", get(list_events))
    .route("/events/{id}", get(get_event))
    .with_state(state)
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchParams {
  q:            String,
  access_token: String,
  fields:       Option<String>,
}

fn directory_matches(state: &StubState, q: &str) -> Value {
  let q = q.to_lowercase();
  let data: Vec<Value> = state
    .directory
    .iter()
    .filter(|(_, name)| name.to_lowercase().contains(&q))
    .map(|(id, name)| {
      json!({
        "id": id,
        "name": name,
        "category": "Cafe",
        "link": format!("https://facebook.com/{id}"),
        "picture": { "data": { "url": format!("https://cdn.example/{id}.png") } }
      })
    })
    .collect();
  json!({ "data": data })
}

async fn graph_search(
  State(state): State<Arc<StubState>>,
  Query(params): Query<SearchParams>,
) -> Reply<Value> {
  state.graph_hits.fetch_add(1, Ordering::SeqCst);
  *state.last_fields.lock().unwrap() = params.fields.clone();
  if params.access_token != GRAPH_TOKEN {
    return Err(reject(
      StatusCode::BAD_REQUEST,
      json!({ "error": {
        "message": "Invalid OAuth access token.",
        "type": "OAuthException",
        "code": 190
      }}),
    ));
  }
  Ok(Json(directory_matches(&state, &params.q)))
}

async fn passthrough_search(
  State(state): State<Arc<StubState>>,
  Query(params): Query<SearchParams>,
) -> Reply<Value> {
  state.fallback_hits.fetch_add(1, Ordering::SeqCst);
  if params.access_token != BACKEND_TOKEN {
    return Err(reject(
      StatusCode::UNAUTHORIZED,
      json!({ "detail": "Invalid access token" }),
    ));
  }
  Ok(Json(directory_matches(&state, &params.q)))
}

// ─── Pages ───────────────────────────────────────────────────────────────────

async fn list_pages(State(state): State<Arc<StubState>>) -> Json<Vec<Page>> {
  Json(state.pages.lock().unwrap().clone())
}

async fn create_page(
  State(state): State<Arc<StubState>>,
  Json(page): Json<Page>,
) -> Result<(StatusCode, Json<Page>), (StatusCode, Json<Value>)> {
  let mut pages = state.pages.lock().unwrap();
  if pages.iter().any(|p| p.page_id == page.page_id) {
    return Err(reject(
      StatusCode::CONFLICT,
      json!({ "detail": "Page already exists" }),
    ));
  }
  pages.push(page.clone());
  Ok((StatusCode::CREATED, Json(page)))
}

async fn delete_page(
  State(state): State<Arc<StubState>>,
  Path(id): Path<String>,
) -> Reply<Value> {
  let mut pages = state.pages.lock().unwrap();
  let before = pages.len();
  pages.retain(|p| p.page_id != id);
  if pages.len() == before {
    return Err(reject(
      StatusCode::NOT_FOUND,
      json!({ "detail": "Page not found" }),
    ));
  }
  state.events.lock().unwrap().retain(|e| e.page_id != id);
  Ok(Json(json!({ "message": "Page deleted" })))
}

async fn fetch_page(
  State(state): State<Arc<StubState>>,
  Path(id): Path<String>,
) -> Reply<Value> {
  state.fetch_hits.fetch_add(1, Ordering::SeqCst);
  if !state.pages.lock().unwrap().iter().any(|p| p.page_id == id) {
    return Err(reject(
      StatusCode::NOT_FOUND,
      json!({ "detail": "Page not found" }),
    ));
  }
  let fresh = state.planned.lock().unwrap().remove(&id).unwrap_or_default();
  let count = fresh.len();
  let mut events = state.events.lock().unwrap();
  for ev in fresh {
    events.retain(|e| e.id != ev.id);
    events.push(ev);
  }
  Ok(Json(json!({
    "message": format!("Fetched {count} events"),
    "events_count": count
  })))
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EventParams {
  page:    u64,
  limit:   u64,
  page_id: Option<String>,
  search:  Option<String>,
}

async fn list_events(
  State(state): State<Arc<StubState>>,
  Query(params): Query<EventParams>,
) -> Reply<Value> {
  if params.page < 1 || params.limit < 1 {
    return Err(reject(
      StatusCode::UNPROCESSABLE_ENTITY,
      json!({ "detail": "page and limit must be positive" }),
    ));
  }

  let mut matching: Vec<Event> = state
    .events
    .lock()
    .unwrap()
    .iter()
    .filter(|e| params.page_id.as_deref().is_none_or(|id| e.page_id == id))
    .filter(|e| {
      params
        .search
        .as_deref()
        .is_none_or(|t| e.name.to_lowercase().contains(&t.to_lowercase()))
    })
    .cloned()
    .collect();
  matching.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));

  let total = matching.len();
  let offset = ((params.page - 1) * params.limit) as usize;
  let data: Vec<Event> = matching
    .into_iter()
    .skip(offset)
    .take(params.limit as usize)
    .collect();
  if state.omit_total.load(Ordering::SeqCst) {
    return Ok(Json(json!({ "data": data })));
  }
  Ok(Json(json!({ "data": data, "total": total })))
}

async fn get_event(
  State(state): State<Arc<StubState>>,
  Path(id): Path<String>,
) -> Reply<Event> {
  state
    .events
    .lock()
    .unwrap()
    .iter()
    .find(|e| e.id == id)
    .cloned()
    .map(Json)
    .ok_or_else(|| {
      reject(
        StatusCode::NOT_FOUND,
        json!({ "detail": "Event not found" }),
      )
    })
}
