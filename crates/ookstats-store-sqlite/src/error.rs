//! Error type for `ookstats-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] ookstats_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("migration {step} failed: {source}")]
  Migration {
    step:   &'static str,
    source: tokio_rusqlite::Error,
  },

  /// The ranking rebuild was asked to run over an empty run table.
  #[error("no runs found in database")]
  NoRuns,
}

impl Error {
  /// Whether the error is SQLite lock contention worth retrying.
  pub fn is_busy(&self) -> bool {
    let text = match self {
      Self::Database(e) | Self::Migration { source: e, .. } => e.to_string(),
      _ => return false,
    };
    let text = text.to_lowercase();
    text.contains("database is locked") || text.contains("busy")
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
