//! Core types, collaborator traits, and orchestration logic for pagesync.
//!
//! This crate has no HTTP dependencies. The two external
//! collaborators (the provider's search endpoint and the system's own
//! registry backend) are expressed as traits in [`gateway`]; concrete
//! transports live in `pagesync-client`.

// Native `async fn` in traits; the advisory lint about `Send` bounds on the
// returned futures does not apply since the traits spell them out.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod event;
pub mod fetch;
pub mod gateway;
pub mod orchestrator;
pub mod page;
pub mod query;
pub mod registry;
pub mod search;

pub use error::{Error, Result};
pub use orchestrator::Orchestrator;

#[cfg(test)]
mod testing;
