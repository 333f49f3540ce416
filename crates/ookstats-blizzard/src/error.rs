//! Error type for `ookstats-blizzard`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("HTTP request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("API request failed with status {status}: {body}")]
  Api {
    status:      u16,
    body:        String,
    /// Parsed `Retry-After` header, when the vendor sent one.
    retry_after: Option<Duration>,
  },

  #[error("failed to decode {endpoint}: {source}")]
  Decode {
    endpoint: String,
    source:   serde_json::Error,
  },

  #[error("authentication failed: {0}")]
  Auth(String),

  #[error(
    "no credentials: set BLIZZARD_API_TOKEN, or BLIZZARD_CLIENT_ID and \
     BLIZZARD_CLIENT_SECRET"
  )]
  MissingCredentials,

  #[error("cancelled")]
  Cancelled,
}

impl Error {
  /// HTTP status of the failure; `0` for anything that never got a response.
  pub fn status(&self) -> u16 {
    match self {
      Self::Api { status, .. } => *status,
      Self::Transport(e) => e.status().map_or(0, |s| s.as_u16()),
      _ => 0,
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Api { status: 404, .. })
  }

  /// Short machine-friendly label, stored alongside fetch failures.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Transport(_) => "transport",
      Self::Api { status: 404, .. } => "missing",
      Self::Api { .. } => "api",
      Self::Decode { .. } => "decode",
      Self::Auth(_) | Self::MissingCredentials => "auth",
      Self::Cancelled => "cancelled",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
