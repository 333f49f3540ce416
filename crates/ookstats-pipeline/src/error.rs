//! Error type for `ookstats-pipeline`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("vendor api error: {0}")]
  Blizzard(#[from] ookstats_blizzard::Error),

  #[error("invalid period list {0:?}; expected e.g. \"1020-1036,1040\"")]
  InvalidPeriods(String),

  #[error("no realms match the configured filters")]
  NoRealms,

  #[error("no dungeons match the configured filters")]
  NoDungeons,
}

impl Error {
  /// Box a backend error.
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
