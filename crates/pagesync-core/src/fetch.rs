//! Per-page event fetch jobs.
//!
//! [`FetchCoordinator::fetch_events`] returns a [`FetchJob`] handle at once
//! and runs the backend call on a spawned task. At most one job per
//! `page_id` is ever `Running`: a call that finds one in flight joins it
//! instead of starting another. The join-or-start decision is made while
//! holding the job table lock.
//!
//! ```text
//! Idle ──▶ Running ──▶ Succeeded
//!             │
//!             └──────▶ Failed(reason)
//! ```
//!
//! Terminal states belong to one attempt; the next call for the same page
//! starts a fresh attempt. There is no retry at this layer.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, watch};

use crate::{
  Error, Result,
  gateway::{GatewayError, JobAcceptance, RegistryBackend},
};

/// Upper bound on a single backend fetch before the job is failed.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

const ABANDONED: &str = "fetch job ended without reporting a result";

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
  /// No job has been started for this page.
  Idle,
  Running,
  Succeeded { events_fetched: Option<u64> },
  Failed { reason: String },
}

impl JobState {
  pub fn is_running(&self) -> bool { matches!(self, JobState::Running) }

  pub fn is_terminal(&self) -> bool {
    matches!(self, JobState::Succeeded { .. } | JobState::Failed { .. })
  }
}

/// Read the effective state from a job channel. A job whose task went away
/// without reporting is treated as failed.
fn effective_state(rx: &watch::Receiver<JobState>) -> JobState {
  let state = rx.borrow().clone();
  if state.is_running() && rx.has_changed().is_err() {
    return JobState::Failed {
      reason: ABANDONED.to_owned(),
    };
  }
  state
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// A handle on one fetch attempt. Cheap to clone; every clone observes the
/// same attempt.
#[derive(Debug, Clone)]
pub struct FetchJob {
  page_id:    String,
  attempt:    u64,
  started_at: DateTime<Utc>,
  state:      watch::Receiver<JobState>,
}

impl FetchJob {
  pub fn page_id(&self) -> &str { &self.page_id }

  /// 1 for the first job ever started for this page, incremented per new
  /// attempt.
  pub fn attempt(&self) -> u64 { self.attempt }

  pub fn started_at(&self) -> DateTime<Utc> { self.started_at }

  pub fn state(&self) -> JobState { effective_state(&self.state) }

  /// Wait for the attempt to finish. Resolves to the number of events the
  /// backend reported fetching, if it said.
  pub async fn wait(&self) -> Result<Option<u64>> {
    let mut rx = self.state.clone();
    let state = match rx.wait_for(JobState::is_terminal).await {
      Ok(state) => (*state).clone(),
      Err(_) => JobState::Failed {
        reason: ABANDONED.to_owned(),
      },
    };
    match state {
      JobState::Succeeded { events_fetched } => Ok(events_fetched),
      JobState::Failed { reason } => Err(Error::FetchFailed { reason }),
      JobState::Idle | JobState::Running => Err(Error::FetchFailed {
        reason: ABANDONED.to_owned(),
      }),
    }
  }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

struct Slot {
  attempt:    u64,
  started_at: DateTime<Utc>,
  state:      watch::Receiver<JobState>,
}

impl Slot {
  fn handle(&self, page_id: &str) -> FetchJob {
    FetchJob {
      page_id:    page_id.to_owned(),
      attempt:    self.attempt,
      started_at: self.started_at,
      state:      self.state.clone(),
    }
  }
}

pub struct FetchCoordinator<B> {
  backend: Arc<B>,
  timeout: Duration,
  jobs:    Mutex<HashMap<String, Slot>>,
}

impl<B: RegistryBackend + 'static> FetchCoordinator<B> {
  pub fn new(backend: Arc<B>) -> Self {
    Self {
      backend,
      timeout: DEFAULT_FETCH_TIMEOUT,
      jobs: Mutex::new(HashMap::new()),
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Start a fetch for `page_id`, or join the one already running.
  ///
  /// Must be called from within a tokio runtime; the backend call runs on a
  /// spawned task.
  pub async fn fetch_events(&self, page_id: &str) -> Result<FetchJob> {
    if page_id.trim().is_empty() {
      return Err(Error::invalid("page id must not be empty"));
    }

    let mut jobs = self.jobs.lock().await;

    let previous_attempt = match jobs.get(page_id) {
      Some(slot) if effective_state(&slot.state).is_running() => {
        tracing::debug!(page_id, attempt = slot.attempt, "joining running fetch job");
        return Ok(slot.handle(page_id));
      }
      Some(slot) => slot.attempt,
      None => 0,
    };

    let (tx, rx) = watch::channel(JobState::Running);
    let slot = Slot {
      attempt:    previous_attempt + 1,
      started_at: Utc::now(),
      state:      rx,
    };
    let handle = slot.handle(page_id);
    jobs.insert(page_id.to_owned(), slot);
    drop(jobs);

    tokio::spawn(run_job(
      Arc::clone(&self.backend),
      page_id.to_owned(),
      handle.attempt,
      self.timeout,
      tx,
    ));

    Ok(handle)
  }

  /// The current attempt for `page_id`, if one was ever started.
  pub async fn job(&self, page_id: &str) -> Option<FetchJob> {
    self.jobs.lock().await.get(page_id).map(|s| s.handle(page_id))
  }

  /// The current state for `page_id`; `Idle` if no job was ever started.
  pub async fn state(&self, page_id: &str) -> JobState {
    self
      .jobs
      .lock()
      .await
      .get(page_id)
      .map_or(JobState::Idle, |s| effective_state(&s.state))
  }

  /// Every known job, ordered by page id.
  pub async fn snapshot(&self) -> Vec<(String, JobState)> {
    let jobs = self.jobs.lock().await;
    let mut all: Vec<_> = jobs
      .iter()
      .map(|(id, slot)| (id.clone(), effective_state(&slot.state)))
      .collect();
    all.sort_by(|a, b| a.0.cmp(&b.0));
    all
  }

  /// Drop the record for `page_id` unless a job is still running. Returns
  /// whether a record was removed.
  pub async fn forget(&self, page_id: &str) -> bool {
    let mut jobs = self.jobs.lock().await;
    match jobs.get(page_id) {
      Some(slot) if !effective_state(&slot.state).is_running() => {
        jobs.remove(page_id);
        true
      }
      _ => false,
    }
  }
}

async fn run_job<B: RegistryBackend>(
  backend: Arc<B>,
  page_id: String,
  attempt: u64,
  limit: Duration,
  tx: watch::Sender<JobState>,
) {
  tracing::info!(%page_id, attempt, "fetch job started");

  let state = match tokio::time::timeout(limit, backend.trigger_fetch(&page_id)).await {
    Ok(Ok(JobAcceptance::Accepted { events_fetched, message })) => {
      tracing::info!(%page_id, attempt, ?events_fetched, ?message, "fetch job succeeded");
      JobState::Succeeded { events_fetched }
    }
    Ok(Ok(JobAcceptance::Rejected { reason })) => {
      tracing::warn!(%page_id, attempt, %reason, "backend rejected fetch");
      JobState::Failed { reason }
    }
    Ok(Err(err)) => {
      tracing::warn!(%page_id, attempt, %err, "fetch job failed");
      JobState::Failed { reason: err.to_string() }
    }
    Err(_) => {
      let err = GatewayError::Timeout(limit);
      tracing::warn!(%page_id, attempt, %err, "fetch job timed out");
      JobState::Failed { reason: err.to_string() }
    }
  };

  tx.send_replace(state);
}
