//! Error types for `pagesync-core`.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Every orchestrator operation either succeeds with a typed value or fails
/// with exactly one of these kinds. "No results" is never an error.
#[derive(Debug, Clone, Error)]
pub enum Error {
  /// Caller-correctable input; never retried automatically.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// Both search tiers failed. `cause` is the fallback tier's error.
  #[error("search failed: {cause}")]
  SearchFailed { cause: GatewayError },

  #[error("registry unavailable: {cause}")]
  RegistryUnavailable { cause: GatewayError },

  #[error("registry write failed: {cause}")]
  RegistryWrite { cause: GatewayError },

  #[error("not found: {0}")]
  NotFound(String),

  /// A fetch job reached its terminal failure state.
  #[error("fetch failed: {reason}")]
  FetchFailed { reason: String },
}

impl Error {
  pub(crate) fn invalid(msg: impl Into<String>) -> Self {
    Error::InvalidInput(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
