//! [`GraphClient`]: direct calls to the provider's page search.

use std::time::Duration;

use pagesync_core::{
  gateway::{GatewayError, SearchGateway},
  page::SearchResult,
};
use reqwest::{Client, Url};

use crate::{
  ClientConfig, build_http, join, parse_base,
  wire::{self, SearchPayload},
};

#[derive(Clone)]
pub struct GraphClient {
  client:  Client,
  base:    Url,
  timeout: Duration,
}

impl GraphClient {
  pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
    let timeout = config.request_timeout();
    Ok(Self {
      client: build_http(timeout)?,
      base: parse_base(&config.graph_url())?,
      timeout,
    })
  }
}

impl SearchGateway for GraphClient {
  /// `GET {graph}/search?q=…&type=page&access_token=…&fields=…`
  async fn search(
    &self,
    query: &str,
    credential: &str,
    fields: &[&str],
  ) -> Result<Vec<SearchResult>, GatewayError> {
    let url = join(&self.base, &["search"]);
    let fields = fields.join(",");
    tracing::debug!(%url, query, %fields, "provider page search");

    let resp = self
      .client
      .get(url)
      .query(&[
        ("q", query),
        ("type", "page"),
        ("access_token", credential),
        ("fields", fields.as_str()),
      ])
      .send()
      .await
      .map_err(|e| wire::transport(e, self.timeout))?;

    let payload: SearchPayload = wire::read_json(resp, "provider search", self.timeout).await?;
    Ok(payload.into_results())
  }
}
