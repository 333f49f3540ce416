//! Error type for `ookstats-static`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[from] ookstats_store_sqlite::Error),

  #[error("failed to write {path}: {source}")]
  Write {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to encode {path}: {source}")]
  Encode {
    path:   PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("page worker failed: {0}")]
  Worker(#[from] tokio::task::JoinError),

  #[error("page queue closed before all pages were written")]
  QueueClosed,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
