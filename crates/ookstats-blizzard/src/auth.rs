//! Bearer token acquisition for the vendor API.
//!
//! Either a fixed token supplied by the operator, or an OAuth client
//! credentials grant whose token is cached until shortly before it expires.

use std::{
  sync::{Mutex, PoisonError},
  time::{Duration, Instant},
};

use serde::Deserialize;

use crate::{Error, Result};

pub const DEFAULT_TOKEN_URL: &str = "https://oauth.battle.net/token";

/// Refresh this long before the vendor-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
  /// A pre-issued bearer token, used as is.
  Static(String),
  ClientCredentials {
    client_id:     String,
    client_secret: String,
  },
}

impl Credentials {
  /// Read `BLIZZARD_API_TOKEN`, else `BLIZZARD_CLIENT_ID` and
  /// `BLIZZARD_CLIENT_SECRET`, from the process environment.
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Like [`Self::from_env`] with an arbitrary variable source. Blank values
  /// count as unset.
  pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let var = |key: &str| {
      get(key)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
    };
    if let Some(token) = var("BLIZZARD_API_TOKEN") {
      return Ok(Self::Static(token));
    }
    match (var("BLIZZARD_CLIENT_ID"), var("BLIZZARD_CLIENT_SECRET")) {
      (Some(client_id), Some(client_secret)) => {
        Ok(Self::ClientCredentials { client_id, client_secret })
      }
      _ => Err(Error::MissingCredentials),
    }
  }
}

#[derive(Debug, Clone)]
struct CachedToken {
  value:      String,
  refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
  #[serde(default)]
  expires_in:   u64,
}

/// Hands out bearer tokens, fetching and caching OAuth tokens on demand.
///
/// The cache lock is never held across a network call; concurrent callers
/// that find the cache empty may each fetch a token, and the last one wins.
#[derive(Debug)]
pub struct TokenSource {
  credentials: Credentials,
  token_url:   String,
  cached:      Mutex<Option<CachedToken>>,
}

impl TokenSource {
  pub fn new(credentials: Credentials, token_url: impl Into<String>) -> Self {
    Self {
      credentials,
      token_url: token_url.into(),
      cached: Mutex::new(None),
    }
  }

  /// A token valid for at least [`EXPIRY_MARGIN`].
  pub async fn bearer(&self, http: &reqwest::Client) -> Result<String> {
    let (client_id, client_secret) = match &self.credentials {
      Credentials::Static(token) => return Ok(token.clone()),
      Credentials::ClientCredentials { client_id, client_secret } => {
        (client_id, client_secret)
      }
    };

    if let Some(token) = self.cached_token() {
      return Ok(token);
    }

    let fresh = self.request_token(http, client_id, client_secret).await?;
    let value = fresh.value.clone();
    *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = Some(fresh);
    Ok(value)
  }

  /// Drop the cached token so the next request fetches a new one. Returns
  /// `false` when there is nothing to refresh (a static token).
  pub fn invalidate(&self) -> bool {
    if matches!(self.credentials, Credentials::Static(_)) {
      return false;
    }
    self.cached.lock().unwrap_or_else(PoisonError::into_inner).take();
    true
  }

  fn cached_token(&self) -> Option<String> {
    let guard = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
    guard
      .as_ref()
      .filter(|t| Instant::now() < t.refresh_at)
      .map(|t| t.value.clone())
  }

  async fn request_token(
    &self,
    http: &reqwest::Client,
    client_id: &str,
    client_secret: &str,
  ) -> Result<CachedToken> {
    let resp = http
      .post(&self.token_url)
      .basic_auth(client_id, Some(client_secret))
      .header(
        reqwest::header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
      )
      .body("grant_type=client_credentials")
      .send()
      .await?;

    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
      return Err(Error::Auth(format!(
        "token endpoint returned {status}: {}",
        body.trim()
      )));
    }

    let token: TokenResponse =
      serde_json::from_str(&body).map_err(|source| Error::Decode {
        endpoint: "oauth token".into(),
        source,
      })?;
    tracing::debug!(expires_in = token.expires_in, "obtained OAuth token");

    let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
    Ok(CachedToken {
      value:      token.access_token,
      refresh_at: Instant::now() + lifetime,
    })
  }
}
