//! Time-bound events, each owned by exactly one tracked page.
//!
//! Events are only ever created or updated as a side effect of a fetch job
//! for their owning page; nothing in this crate constructs them from user
//! input.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:          String,
  pub page_id:     String,
  /// Owning page's name, when the backend denormalises it onto the event.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page_name:   Option<String>,
  pub name:        String,
  #[serde(deserialize_with = "deserialize_start_time")]
  pub start_time:  DateTime<Utc>,
  #[serde(default)]
  pub location:    Option<String>,
  #[serde(default)]
  pub is_canceled: bool,
}

impl Event {
  /// Public link to the event on the provider's site.
  pub fn permalink(&self) -> String {
    format!("https://facebook.com/events/{}", self.id)
  }
}

/// Parse an event timestamp.
///
/// Accepts RFC 3339, the provider's colon-less offset form
/// (`2024-05-01T19:00:00+0000`), and naive ISO-8601, which is read as UTC.
pub fn parse_start_time(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc())
}

fn deserialize_start_time<'de, D>(d: D) -> Result<DateTime<Utc>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = String::deserialize(d)?;
  parse_start_time(&raw).map_err(|e| {
    serde::de::Error::custom(format!("invalid start_time {raw:?}: {e}"))
  })
}
