//! Tracked pages and the ephemeral search results they are created from.

use serde::{Deserialize, Serialize};

/// A page whose events the system ingests. `page_id` is the provider's
/// stable identifier and is unique within the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  pub page_id:  String,
  pub name:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url:      Option<String>,
}

/// One candidate page returned by a search. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
  /// The provider's page id.
  pub id:          String,
  pub name:        String,
  pub category:    Option<String>,
  pub link:        Option<String>,
  pub picture_url: Option<String>,
}

impl SearchResult {
  /// Map a candidate onto the registry's shape: `link` becomes `url` and the
  /// picture is dropped.
  pub fn to_page(&self) -> Page { self.clone().into() }
}

impl From<SearchResult> for Page {
  fn from(r: SearchResult) -> Self {
    Page {
      page_id:  r.id,
      name:     r.name,
      category: r.category,
      url:      r.link,
    }
  }
}
