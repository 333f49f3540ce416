//! Error types for `ookstats-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown percentile bracket: {0:?}")]
  UnknownBracket(String),

  #[error("unknown ranking type: {0:?}")]
  UnknownRankingType(String),

  #[error("unknown fetch status: {0:?}")]
  UnknownFetchStatus(String),

  #[error("achievement milestone missing: {0}")]
  MissingMilestone(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
