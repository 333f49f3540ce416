//! Core types and trait definitions for ookstats.
//!
//! This crate is free of HTTP and database dependencies. It holds the domain
//! records that flow between the fetcher, the store and the static emitter,
//! the pure identity and ranking rules, and the static game reference tables.

pub mod error;
pub mod identity;
pub mod model;
pub mod ranking;
pub mod slug;
pub mod store;
pub mod wow;

pub use error::{Error, Result};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
  chrono::Utc::now().timestamp_millis()
}
