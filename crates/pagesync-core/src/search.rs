//! Page search with a primary/fallback strategy.
//!
//! The provider's search endpoint is tried first. If it fails for any reason
//! the backend's passthrough is tried exactly once with the same inputs. When
//! both fail, the **fallback's** error is the one surfaced.

use std::{future::Future, sync::Arc};

use crate::{
  Error, Result,
  gateway::{GatewayError, RegistryBackend, SearchGateway},
  page::SearchResult,
};

/// Field projection requested from the provider.
pub const SEARCH_FIELDS: &[&str] = &["id", "name", "category", "link", "picture"];

/// Which tier produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
  Primary,
  Fallback,
}

/// Both tiers failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted<E> {
  pub primary:  E,
  pub fallback: E,
}

impl<E> Exhausted<E> {
  /// The error reported to callers: always the fallback's.
  pub fn surfaced(self) -> E { self.fallback }
}

/// Run `primary`; if and only if it fails, build and run the fallback from
/// the primary's error.
pub async fn two_tier<T, E, P, F, Fut>(
  primary: P,
  fallback: F,
) -> Result<(Tier, T), Exhausted<E>>
where
  P: Future<Output = Result<T, E>>,
  F: FnOnce(&E) -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let primary_err = match primary.await {
    Ok(v) => return Ok((Tier::Primary, v)),
    Err(e) => e,
  };
  match fallback(&primary_err).await {
    Ok(v) => Ok((Tier::Fallback, v)),
    Err(fallback_err) => Err(Exhausted {
      primary:  primary_err,
      fallback: fallback_err,
    }),
  }
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct SearchOrchestrator<G, B> {
  primary:  Arc<G>,
  fallback: Arc<B>,
}

impl<G, B> SearchOrchestrator<G, B>
where
  G: SearchGateway,
  B: RegistryBackend,
{
  pub fn new(primary: Arc<G>, fallback: Arc<B>) -> Self {
    Self { primary, fallback }
  }

  /// Search for pages. An empty list means "no matches" and is not an error.
  pub async fn search(
    &self,
    query: &str,
    credential: &str,
  ) -> Result<Vec<SearchResult>> {
    self.search_tiered(query, credential).await.map(|(_, r)| r)
  }

  /// As [`search`](Self::search), also reporting which tier answered.
  pub async fn search_tiered(
    &self,
    query: &str,
    credential: &str,
  ) -> Result<(Tier, Vec<SearchResult>)> {
    if query.trim().is_empty() {
      return Err(Error::invalid("search query must not be empty"));
    }
    if credential.trim().is_empty() {
      return Err(Error::invalid("access token must not be empty"));
    }

    let outcome = two_tier(
      self.primary.search(query, credential, SEARCH_FIELDS),
      |err: &GatewayError| {
        tracing::warn!(%err, query, "primary search failed; trying backend passthrough");
        self.fallback.search_passthrough(query, credential)
      },
    )
    .await;

    match outcome {
      Ok((tier, results)) => {
        tracing::debug!(?tier, count = results.len(), query, "search complete");
        Ok((tier, results))
      }
      Err(exhausted) => {
        tracing::warn!(
          primary = %exhausted.primary,
          fallback = %exhausted.fallback,
          query,
          "both search tiers failed"
        );
        Err(Error::SearchFailed { cause: exhausted.surfaced() })
      }
    }
  }
}
