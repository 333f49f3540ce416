//! SQLite backend for the ookstats run store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Besides the [`RunStore`] operations it
//! owns the ranking rebuild and the bulk reads used by the static emitter.
//!
//! [`RunStore`]: ookstats_core::store::RunStore

mod identity;
mod ingest;
mod migrate;
mod profiles;
mod rankings;
mod reference;
mod retry;
mod schema;
mod seasons;
mod store;

pub mod error;
pub mod loader;

pub use error::{Error, Result};
pub use rankings::RebuildStats;
pub use store::SqliteStore;
