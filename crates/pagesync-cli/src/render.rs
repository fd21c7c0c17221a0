//! Plain-text rendering for terminal output. `--json` bypasses all of this.

use chrono::{DateTime, Utc};
use pagesync_core::{
  event::Event,
  fetch::JobState,
  page::{Page, SearchResult},
  query::EventPage,
  registry::{AddOutcome, AddStatus},
};

const TIME_FORMAT: &str = "%b %-d, %Y %-I:%M %p";

pub fn start_time(at: &DateTime<Utc>) -> String { at.format(TIME_FORMAT).to_string() }

pub fn status(event: &Event) -> &'static str {
  if event.is_canceled { "Canceled" } else { "Active" }
}

pub fn search_result(result: &SearchResult) -> String {
  let mut line = format!("{}  {}", result.id, result.name);
  if let Some(category) = &result.category {
    line.push_str(&format!("  [{category}]"));
  }
  if let Some(link) = &result.link {
    line.push_str(&format!("  {link}"));
  }
  line
}

pub fn page(page: &Page) -> String {
  let mut line = format!("{}  {}", page.page_id, page.name);
  if let Some(category) = &page.category {
    line.push_str(&format!("  [{category}]"));
  }
  if let Some(url) = &page.url {
    line.push_str(&format!("  {url}"));
  }
  line
}

pub fn add_outcome(outcome: &AddOutcome) -> String {
  let AddOutcome { page, status } = outcome;
  match status {
    AddStatus::Added => format!("Added page \"{}\" ({})", page.name, page.page_id),
    AddStatus::AlreadyTracked => {
      format!("Page \"{}\" ({}) is already monitored", page.name, page.page_id)
    }
  }
}

/// One row of the event table: time, status, name, page, location.
pub fn event_row(event: &Event) -> String {
  let page = event.page_name.as_deref().unwrap_or(&event.page_id);
  let location = event.location.as_deref().unwrap_or("-");
  format!(
    "{:<22} {:<8} {}  ({page}, {location})",
    start_time(&event.start_time),
    status(event),
    event.name,
  )
}

pub fn event_detail(event: &Event) -> String {
  let page = match &event.page_name {
    Some(name) => format!("{name} ({})", event.page_id),
    None => event.page_id.clone(),
  };
  [
    event.name.clone(),
    format!("  id:       {}", event.id),
    format!("  page:     {page}"),
    format!("  starts:   {}", start_time(&event.start_time)),
    format!("  location: {}", event.location.as_deref().unwrap_or("-")),
    format!("  status:   {}", status(event)),
    format!("  link:     {}", event.permalink()),
  ]
  .join("\n")
}

pub fn page_footer(page_number: u32, page_size: u32, page: &EventPage) -> String {
  format!(
    "Page {page_number} of {} ({} events)",
    page.page_count(page_size).max(1),
    page.total,
  )
}

pub fn job_outcome(page_id: &str, state: &JobState) -> String {
  match state {
    JobState::Succeeded { events_fetched: Some(n) } => {
      format!("{page_id}: fetched {n} events")
    }
    JobState::Succeeded { events_fetched: None } => format!("{page_id}: fetch completed"),
    JobState::Failed { reason } => format!("{page_id}: fetch failed: {reason}"),
    JobState::Running => format!("{page_id}: still running"),
    JobState::Idle => format!("{page_id}: no fetch has run"),
  }
}
