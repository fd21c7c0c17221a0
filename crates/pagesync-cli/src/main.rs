//! `pagesync`: track provider pages and browse their synchronized events.
//!
//! # Usage
//!
//! ```
//! pagesync search "jazz club" --token $TOKEN
//! pagesync pages add 1234567890 --name "Jazz Club" --category Bar
//! pagesync fetch --all
//! pagesync events --page 2 --search jazz
//! pagesync sync --interval 300
//! ```
//!
//! Settings come from `pagesync.toml` (or `--config`) and `PAGESYNC_*`
//! environment variables; see [`settings::Settings`].

mod render;
mod settings;

use std::{collections::HashSet, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context as _, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use pagesync_client::{BackendClient, GraphClient};
use pagesync_core::{
  Orchestrator,
  fetch::{FetchJob, JobState},
  page::SearchResult,
  query::EventQuery,
};
use serde::Serialize;
use settings::Settings;
use tokio::time::MissedTickBehavior;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

type App = Orchestrator<GraphClient, BackendClient>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pagesync", version, about = "Track pages and synchronize their events")]
struct Cli {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// Base URL of the pagesync backend (overrides the config file).
  #[arg(long, value_name = "URL", global = true)]
  api_url: Option<String>,

  /// Print machine-readable JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  /// Increase log verbosity (-v info, -vv debug, -vvv trace).
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Search the provider for pages, falling back to the backend.
  Search {
    query: String,

    /// Provider access token (defaults to `access_token` from settings).
    #[arg(long)]
    token: Option<String>,
  },

  /// Manage the set of monitored pages.
  Pages {
    #[command(subcommand)]
    action: PagesCommand,
  },

  /// Trigger event fetches and wait for them to settle.
  Fetch {
    page_ids: Vec<String>,

    /// Fetch every monitored page.
    #[arg(long, conflicts_with = "page_ids")]
    all: bool,
  },

  /// List synchronized events in the backend's order.
  Events {
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Events per page (defaults to `events_per_page`).
    #[arg(long)]
    limit: Option<u32>,

    /// Only events whose text matches.
    #[arg(long)]
    search: Option<String>,

    /// Only events belonging to this page.
    #[arg(long)]
    page_id: Option<String>,
  },

  /// Show a single event.
  Event { event_id: String },

  /// Re-fetch every monitored page on an interval until interrupted.
  Sync {
    /// Seconds between rounds (defaults to `refresh_interval_secs`).
    #[arg(long)]
    interval: Option<u64>,
  },
}

#[derive(Subcommand, Debug)]
enum PagesCommand {
  /// List monitored pages.
  List,

  /// Start monitoring a page.
  Add {
    page_id: String,

    #[arg(long)]
    name: String,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    url: Option<String>,
  },

  /// Stop monitoring a page and drop its events.
  Remove { page_id: String },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let level = match cli.verbose {
    0 => LevelFilter::WARN,
    1 => LevelFilter::INFO,
    2 => LevelFilter::DEBUG,
    _ => LevelFilter::TRACE,
  };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let mut settings = Settings::load(cli.config.as_deref())?;
  if let Some(url) = cli.api_url.clone() {
    settings.api_base_url = url;
  }

  let client_cfg = settings.client_config();
  let graph = GraphClient::new(&client_cfg).context("failed to configure provider client")?;
  let backend = BackendClient::new(&client_cfg).context("failed to configure backend client")?;
  let app = Orchestrator::new(Arc::new(graph), Arc::new(backend))
    .with_fetch_timeout(settings.fetch_timeout());

  run(&app, &settings, cli.command, cli.json).await
}

async fn run(app: &App, settings: &Settings, command: Command, json: bool) -> Result<()> {
  match command {
    Command::Search { query, token } => {
      let token = token.or_else(|| settings.access_token.clone()).unwrap_or_default();
      let results = app.search(&query, &token).await?;
      if json {
        return print_json(&results);
      }
      if results.is_empty() {
        println!("No pages found matching {query:?}.");
      }
      for result in &results {
        println!("{}", render::search_result(result));
      }
    }

    Command::Pages { action } => pages(app, action, json).await?,

    Command::Fetch { page_ids, all } => {
      let jobs = if all {
        app.fetch_all().await?
      } else {
        if page_ids.is_empty() {
          bail!("name at least one page id, or pass --all");
        }
        let mut jobs = Vec::with_capacity(page_ids.len());
        for page_id in dedup(page_ids) {
          jobs.push(app.fetch_events(&page_id).await?);
        }
        jobs
      };
      report(&jobs, json).await?;
    }

    Command::Events { page, limit, search, page_id } => {
      let page_size = limit.unwrap_or(settings.events_per_page);
      let mut query = EventQuery::new(page, page_size);
      if let Some(text) = search {
        query = query.with_search(text);
      }
      if let Some(id) = page_id {
        query = query.with_page_id(id);
      }

      let events = app.query_events(&query).await?;
      if json {
        return print_json(&events);
      }
      if events.items.is_empty() {
        println!("No events found.");
      }
      for event in &events.items {
        println!("{}", render::event_row(event));
      }
      if events.total > 0 {
        println!("{}", render::page_footer(page, page_size, &events));
      }
    }

    Command::Event { event_id } => {
      let event = app.get_event(&event_id).await?;
      if json {
        return print_json(&event);
      }
      println!("{}", render::event_detail(&event));
    }

    Command::Sync { interval } => {
      let every = interval
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| settings.refresh_interval());
      sync(app, every, json).await?;
    }
  }
  Ok(())
}

// ─── Pages ────────────────────────────────────────────────────────────────────

async fn pages(app: &App, action: PagesCommand, json: bool) -> Result<()> {
  match action {
    PagesCommand::List => {
      let pages = app.list_pages().await?;
      if json {
        return print_json(&pages);
      }
      if pages.is_empty() {
        println!("No pages are being monitored.");
      }
      for page in &pages {
        println!("{}", render::page(page));
      }
    }
    PagesCommand::Add { page_id, name, category, url } => {
      let candidate = SearchResult {
        id: page_id,
        name,
        category,
        link: url,
        picture_url: None,
      };
      let outcome = app.add_page(&candidate).await?;
      if json {
        return print_json(&outcome);
      }
      println!("{}", render::add_outcome(&outcome));
    }
    PagesCommand::Remove { page_id } => {
      app.remove_page(&page_id).await?;
      if json {
        return print_json(&serde_json::json!({ "removed": page_id }));
      }
      println!("Removed page {page_id}.");
    }
  }
  Ok(())
}

// ─── Fetch ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JobReport {
  page_id: String,
  attempt: u64,
  state:   JobState,
}

/// Wait for every job, print its outcome, and fail if any job failed.
async fn report(jobs: &[FetchJob], json: bool) -> Result<()> {
  let mut reports = Vec::with_capacity(jobs.len());
  for job in jobs {
    if let Err(e) = job.wait().await {
      warn!(page_id = job.page_id(), error = %e, "fetch failed");
    }
    reports.push(JobReport {
      page_id: job.page_id().to_owned(),
      attempt: job.attempt(),
      state:   job.state(),
    });
  }

  if json {
    print_json(&reports)?;
  } else if reports.is_empty() {
    println!("No pages are being monitored.");
  } else {
    for r in &reports {
      println!("{}", render::job_outcome(&r.page_id, &r.state));
    }
  }

  let failed = reports
    .iter()
    .filter(|r| matches!(r.state, JobState::Failed { .. }))
    .count();
  if failed > 0 {
    bail!("{failed} of {} fetch jobs failed", reports.len());
  }
  Ok(())
}

async fn sync(app: &App, every: Duration, json: bool) -> Result<()> {
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  let shutdown = tokio::signal::ctrl_c();
  tokio::pin!(shutdown);

  info!(interval_secs = every.as_secs(), "starting sync loop");
  loop {
    tokio::select! {
      res = &mut shutdown => {
        res.context("failed to listen for ctrl-c")?;
        info!("interrupted; stopping sync loop");
        return Ok(());
      }
      () = async {
        ticker.tick().await;
        if let Err(e) = sync_round(app, json).await {
          warn!(error = %e, "sync round failed");
        }
      } => {}
    }
  }
}

async fn sync_round(app: &App, json: bool) -> Result<()> {
  let jobs = app.fetch_all().await?;
  report(&jobs, json).await
}

/// Drop repeated ids, keeping first occurrences in order.
fn dedup(ids: Vec<String>) -> Vec<String> {
  let mut seen = HashSet::new();
  ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
