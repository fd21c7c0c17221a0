//! JSON shapes exchanged with the provider and the backend, and the mapping
//! from HTTP failures onto [`GatewayError`].

use std::time::Duration;

use pagesync_core::{
  event::Event,
  gateway::{GatewayError, JobAcceptance},
  page::SearchResult,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

// ─── Search ──────────────────────────────────────────────────────────────────

/// A page as the provider returns it.
#[derive(Debug, Deserialize)]
pub struct GraphPage {
  pub id:       String,
  pub name:     String,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub link:     Option<String>,
  #[serde(default)]
  pub picture:  Option<GraphPicture>,
}

/// `"picture": { "data": { "url": "..." } }`
#[derive(Debug, Deserialize)]
pub struct GraphPicture {
  #[serde(default)]
  pub data: Option<GraphPictureData>,
}

#[derive(Debug, Deserialize)]
pub struct GraphPictureData {
  #[serde(default)]
  pub url: Option<String>,
}

impl From<GraphPage> for SearchResult {
  fn from(p: GraphPage) -> Self {
    SearchResult {
      id:          p.id,
      name:        p.name,
      category:    p.category,
      link:        p.link,
      picture_url: p.picture.and_then(|pic| pic.data).and_then(|d| d.url),
    }
  }
}

/// The provider wraps results in `{"data": [...]}`; the backend passthrough
/// usually does too, but a bare array is accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SearchPayload {
  Envelope {
    #[serde(default)]
    data: Vec<GraphPage>,
  },
  Bare(Vec<GraphPage>),
}

impl SearchPayload {
  pub fn into_results(self) -> Vec<SearchResult> {
    let pages = match self {
      SearchPayload::Envelope { data } => data,
      SearchPayload::Bare(pages) => pages,
    };
    pages.into_iter().map(SearchResult::from).collect()
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// `GET /events/` response.
#[derive(Debug, Deserialize)]
pub struct EventsEnvelope {
  #[serde(default)]
  pub data:  Vec<Event>,
  pub total: u64,
}

// ─── Fetch trigger ───────────────────────────────────────────────────────────

/// Interpret a successful fetch-trigger body. Backends answer with a
/// summary object, the fetched events themselves, or nothing at all.
pub fn acceptance_from_body(body: &str) -> JobAcceptance {
  let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
  let (events_fetched, message) = match &value {
    Value::Array(items) => (Some(items.len() as u64), None),
    Value::Object(obj) => {
      let count = ["events_fetched", "events_count", "count"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_u64))
        .or_else(|| {
          obj
            .get("events")
            .and_then(Value::as_array)
            .map(|a| a.len() as u64)
        });
      let message = obj
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned);
      (count, message)
    }
    _ => (None, None),
  };
  JobAcceptance::Accepted {
    events_fetched,
    message,
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
  error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
  message: String,
  #[serde(default)]
  code:    Option<i64>,
}

/// Provider error codes for invalid/expired credentials.
const AUTH_CODES: &[i64] = &[102, 190];
/// Provider error codes for throttling.
const THROTTLE_CODES: &[i64] = &[4, 17, 32, 613];

/// Turn a non-success response into a [`GatewayError`].
pub fn classify(status: u16, body: &str) -> GatewayError {
  let graph = serde_json::from_str::<GraphErrorEnvelope>(body)
    .ok()
    .map(|e| e.error);
  let code = graph.as_ref().and_then(|g| g.code);

  let message = match &graph {
    Some(g) => match g.code {
      Some(code) => format!("{} (code {code})", g.message),
      None => g.message.clone(),
    },
    None => backend_message(body).unwrap_or_else(|| {
      if body.trim().is_empty() {
        format!("HTTP {status}")
      } else {
        body.trim().to_owned()
      }
    }),
  };

  let is_code = |codes: &[i64]| code.is_some_and(|c| codes.contains(&c));

  if matches!(status, 401 | 403) || is_code(AUTH_CODES) {
    GatewayError::Unauthorized(message)
  } else if status == 429 || is_code(THROTTLE_CODES) {
    GatewayError::RateLimited(message)
  } else if status == 404 {
    GatewayError::NotFound(message)
  } else if status == 409 {
    GatewayError::Conflict(message)
  } else {
    GatewayError::Status { status, message }
  }
}

/// `{"message": "..."}` or `{"detail": "..."}`.
fn backend_message(body: &str) -> Option<String> {
  let value: Value = serde_json::from_str(body).ok()?;
  ["message", "detail"]
    .iter()
    .find_map(|k| value.get(*k).and_then(Value::as_str))
    .map(str::to_owned)
}

pub fn transport(err: reqwest::Error, timeout: Duration) -> GatewayError {
  if err.is_timeout() {
    GatewayError::Timeout(timeout)
  } else {
    GatewayError::Transport(err.to_string())
  }
}

/// Read a JSON body from a successful response, or classify the failure.
pub async fn read_json<T: DeserializeOwned>(
  resp: reqwest::Response,
  what: &str,
  timeout: Duration,
) -> Result<T, GatewayError> {
  let body = read_body(resp, timeout).await?;
  serde_json::from_str(&body).map_err(|e| GatewayError::Decode(format!("{what}: {e}")))
}

/// Read the body of a successful response as text, or classify the failure.
pub async fn read_body(
  resp: reqwest::Response,
  timeout: Duration,
) -> Result<String, GatewayError> {
  let status = resp.status();
  let body = resp.text().await.map_err(|e| transport(e, timeout))?;
  if !status.is_success() {
    return Err(classify(status.as_u16(), &body));
  }
  Ok(body)
}
