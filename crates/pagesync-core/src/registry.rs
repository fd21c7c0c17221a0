//! The registry of tracked pages.
//!
//! [`PageRegistry`] owns add/remove/list against the backend and keeps an
//! in-memory view in step with its own mutations. Changes made by anyone
//! else only become visible after an explicit [`PageRegistry::list`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::{
  Error, Result,
  gateway::{GatewayError, RegistryBackend},
  page::{Page, SearchResult},
};

/// Whether [`PageRegistry::add`] created a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddStatus {
  Added,
  /// The page was already tracked; nothing was written.
  AlreadyTracked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
  pub page:   Page,
  pub status: AddStatus,
}

pub struct PageRegistry<B> {
  backend: Arc<B>,
  view:    RwLock<Vec<Page>>,
  /// Serialises add/remove so the duplicate check and the write happen
  /// as one step.
  writes:  Mutex<()>,
}

impl<B: RegistryBackend> PageRegistry<B> {
  pub fn new(backend: Arc<B>) -> Self {
    Self {
      backend,
      view: RwLock::new(Vec::new()),
      writes: Mutex::new(()),
    }
  }

  /// Fetch the tracked pages from the backend and refresh the local view.
  pub async fn list(&self) -> Result<Vec<Page>> {
    let pages = self
      .backend
      .list_pages()
      .await
      .map_err(|cause| Error::RegistryUnavailable { cause })?;
    *self.view.write().await = pages.clone();
    Ok(pages)
  }

  /// The local view as of the last refresh or local mutation.
  pub async fn cached(&self) -> Vec<Page> { self.view.read().await.clone() }

  /// Start tracking a search result. Adding an already-tracked `page_id` is
  /// a no-op reported as [`AddStatus::AlreadyTracked`].
  pub async fn add(&self, candidate: &SearchResult) -> Result<AddOutcome> {
    if candidate.id.trim().is_empty() {
      return Err(Error::invalid("page id must not be empty"));
    }

    let _guard = self.writes.lock().await;

    // A failed duplicate check is a failed add.
    let current = self
      .backend
      .list_pages()
      .await
      .map_err(|cause| Error::RegistryWrite { cause })?;
    *self.view.write().await = current.clone();
    if let Some(existing) = current.into_iter().find(|p| p.page_id == candidate.id) {
      tracing::info!(page_id = %existing.page_id, "page already tracked");
      return Ok(AddOutcome {
        page:   existing,
        status: AddStatus::AlreadyTracked,
      });
    }

    let page = candidate.to_page();
    match self.backend.create_page(&page).await {
      Ok(stored) => {
        tracing::info!(page_id = %stored.page_id, name = %stored.name, "page added");
        self.view.write().await.push(stored.clone());
        Ok(AddOutcome {
          page:   stored,
          status: AddStatus::Added,
        })
      }
      Err(GatewayError::Conflict(msg)) => {
        tracing::info!(page_id = %page.page_id, %msg, "backend reports page already tracked");
        let mut view = self.view.write().await;
        if !view.iter().any(|p| p.page_id == page.page_id) {
          view.push(page.clone());
        }
        Ok(AddOutcome {
          page,
          status: AddStatus::AlreadyTracked,
        })
      }
      Err(cause) => Err(Error::RegistryWrite { cause }),
    }
  }

  /// Stop tracking a page. The backend cascades the removal to the page's
  /// events.
  pub async fn remove(&self, page_id: &str) -> Result<()> {
    if page_id.trim().is_empty() {
      return Err(Error::invalid("page id must not be empty"));
    }

    let _guard = self.writes.lock().await;

    let outcome = self.backend.delete_page(page_id).await;
    // Either way the page is no longer tracked.
    if matches!(outcome, Ok(()) | Err(GatewayError::NotFound(_))) {
      self.view.write().await.retain(|p| p.page_id != page_id);
    }

    match outcome {
      Ok(()) => {
        tracing::info!(page_id, "page removed");
        Ok(())
      }
      Err(GatewayError::NotFound(_)) => {
        Err(Error::NotFound(format!("page {page_id} is not tracked")))
      }
      Err(cause) => Err(Error::RegistryWrite { cause }),
    }
  }
}
