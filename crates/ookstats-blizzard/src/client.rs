//! Async HTTP client for the vendor game-data and profile APIs.

use std::{
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
  time::{Duration, Instant},
};

use ookstats_core::{
  identity::AchievementRecord,
  model::{
    CharacterProfile, CharacterSummary, DungeonInfo, EquippedItem, Leaderboard,
    RealmInfo, SeasonRecord,
  },
};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;

use crate::{
  Error, Result,
  auth::{Credentials, DEFAULT_TOKEN_URL, TokenSource},
  types::{
    AchievementsResponse, CharacterStatus, EquipmentResponse, LeaderboardResponse,
    MediaResponse, PeriodIndexResponse, SeasonDetailResponse, SeasonIndex,
    SeasonIndexResponse, StatusResponse, SummaryResponse,
  },
};

/// API host template; `{region}` is substituted per request.
pub const DEFAULT_API_BASE: &str = "https://{region}.api.blizzard.com";
pub const DEFAULT_CONCURRENCY: usize = 20;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("ookstats/", env!("CARGO_PKG_VERSION"));

// ─── Configuration ───────────────────────────────────────────────────────────

/// How a single request is retried.
///
/// 429 responses wait for `Retry-After` (or `default_retry_after`) and do not
/// count against `attempts`. 404 and other 4xx responses fail immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub attempts:            u32,
  pub base_delay:          Duration,
  pub default_retry_after: Duration,
  /// Rate-limit waits allowed per request on top of `attempts`.
  pub rate_limit_waits:    u32,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempts:            3,
      base_delay:          Duration::from_secs(1),
      default_retry_after: Duration::from_secs(2),
      rate_limit_waits:    5,
    }
  }
}

impl RetryPolicy {
  /// Sleep before retry number `retry` (1-based): `base · 2^(retry-1)`.
  pub fn backoff(&self, retry: u32) -> Duration {
    self
      .base_delay
      .saturating_mul(1u32 << retry.saturating_sub(1).min(16))
  }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
  pub api_base:    String,
  pub token_url:   String,
  pub timeout:     Duration,
  /// Maximum requests in flight across every clone of the client.
  pub concurrency: usize,
  pub retry:       RetryPolicy,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      api_base:    DEFAULT_API_BASE.into(),
      token_url:   DEFAULT_TOKEN_URL.into(),
      timeout:     DEFAULT_TIMEOUT,
      concurrency: DEFAULT_CONCURRENCY,
      retry:       RetryPolicy::default(),
    }
  }
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Request counters for diagnostics. Only requests that got a response are
/// counted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClientStats {
  pub requests:       u64,
  pub not_found:      u64,
  pub avg_latency_ms: f64,
}

#[derive(Debug, Default)]
struct Counters {
  requests:   AtomicU64,
  not_found:  AtomicU64,
  latency_ms: AtomicU64,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Authenticated client for the vendor API.
///
/// Cheap to clone; clones share the connection pool, the token cache, the
/// in-flight cap and the counters.
#[derive(Clone)]
pub struct BlizzardClient {
  http:     reqwest::Client,
  config:   Arc<ClientConfig>,
  tokens:   Arc<TokenSource>,
  limiter:  Arc<Semaphore>,
  counters: Arc<Counters>,
}

impl BlizzardClient {
  pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(config.timeout)
      .user_agent(USER_AGENT)
      .build()?;
    let tokens = Arc::new(TokenSource::new(credentials, config.token_url.clone()));
    let limiter = Arc::new(Semaphore::new(config.concurrency.max(1)));
    Ok(Self {
      http,
      config: Arc::new(config),
      tokens,
      limiter,
      counters: Arc::default(),
    })
  }

  pub fn config(&self) -> &ClientConfig {
    &self.config
  }

  pub fn stats(&self) -> ClientStats {
    let requests = self.counters.requests.load(Ordering::Relaxed);
    let latency = self.counters.latency_ms.load(Ordering::Relaxed);
    ClientStats {
      requests,
      not_found: self.counters.not_found.load(Ordering::Relaxed),
      avg_latency_ms: if requests == 0 {
        0.0
      } else {
        latency as f64 / requests as f64
      },
    }
  }

  fn base(&self, region: &str) -> String {
    self
      .config
      .api_base
      .replace("{region}", region)
      .trim_end_matches('/')
      .to_owned()
  }

  fn profile_url(&self, region: &str, realm_slug: &str, name: &str, suffix: &str) -> String {
    format!(
      "{}/profile/wow/character/{realm_slug}/{}{suffix}?namespace=profile-classic-{region}&locale=en_US",
      self.base(region),
      name.to_lowercase(),
    )
  }

  // ── Request loop ──────────────────────────────────────────────────────────

  async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, url: &str) -> Result<T> {
    let policy = self.config.retry;
    let mut attempt = 0u32;
    let mut reauthorized = false;
    let mut waits = 0u32;

    loop {
      if attempt > 0 {
        let delay = policy.backoff(attempt);
        tracing::debug!(endpoint, attempt, ?delay, "retrying request");
        tokio::time::sleep(delay).await;
      }

      let err = match self.get_once(endpoint, url).await {
        Ok(value) => return Ok(value),
        Err(e) => e,
      };

      let (status, retry_after) = match &err {
        Error::Api { status, retry_after, .. } => (Some(*status), *retry_after),
        _ => (None, None),
      };
      match status {
        Some(429) if waits >= policy.rate_limit_waits => {
          tracing::warn!(endpoint, waits, "still rate limited; giving up");
          return Err(err);
        }
        Some(429) => {
          waits += 1;
          let delay = retry_after.unwrap_or(policy.default_retry_after);
          tracing::warn!(endpoint, ?delay, "rate limited; backing off");
          tokio::time::sleep(delay).await;
          continue;
        }
        Some(404) => return Err(err),
        Some(401) if !reauthorized && self.tokens.invalidate() => {
          tracing::debug!(endpoint, "token rejected; refreshing");
          reauthorized = true;
          continue;
        }
        Some(s) if (400..500).contains(&s) => return Err(err),
        None if matches!(
          err,
          Error::Auth(_) | Error::MissingCredentials | Error::Cancelled
        ) =>
        {
          return Err(err);
        }
        _ => {}
      }

      attempt += 1;
      if attempt >= policy.attempts {
        tracing::debug!(endpoint, attempts = attempt, error = %err, "giving up");
        return Err(err);
      }
    }
  }

  async fn get_once<T: DeserializeOwned>(&self, endpoint: &str, url: &str) -> Result<T> {
    let token = self.tokens.bearer(&self.http).await?;
    let _permit = self.limiter.acquire().await.map_err(|_| Error::Cancelled)?;

    let start = Instant::now();
    let resp = self.http.get(url).bearer_auth(token).send().await?;
    let status = resp.status();
    let retry_after = parse_retry_after(resp.headers());
    let body = resp.text().await?;
    let elapsed = start.elapsed();
    self.record(status.as_u16(), elapsed);
    tracing::debug!(
      endpoint,
      status = status.as_u16(),
      elapsed_ms = elapsed.as_millis() as u64,
      "vendor request"
    );

    if !status.is_success() {
      return Err(Error::Api {
        status: status.as_u16(),
        body: body.trim().to_owned(),
        retry_after,
      });
    }
    serde_json::from_str(&body).map_err(|source| Error::Decode {
      endpoint: endpoint.to_owned(),
      source,
    })
  }

  fn record(&self, status: u16, elapsed: Duration) {
    self.counters.requests.fetch_add(1, Ordering::Relaxed);
    if status == 404 {
      self.counters.not_found.fetch_add(1, Ordering::Relaxed);
    }
    let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    self.counters.latency_ms.fetch_add(ms, Ordering::Relaxed);
  }

  // ── Leaderboards ──────────────────────────────────────────────────────────

  /// `GET /data/wow/connected-realm/{id}/mythic-leaderboard/{dungeon}/period/{period}`
  pub async fn leaderboard(
    &self,
    realm: &RealmInfo,
    dungeon: &DungeonInfo,
    period: i64,
  ) -> Result<Leaderboard> {
    let url = format!(
      "{}/data/wow/connected-realm/{}/mythic-leaderboard/{}/period/{period}?namespace=dynamic-classic-{}",
      self.base(&realm.region),
      realm.id,
      dungeon.id,
      realm.region,
    );
    let wire: LeaderboardResponse = self.get_json("leaderboard", &url).await?;
    Ok(wire.into_leaderboard(period))
  }

  /// Period ids for `region`, newest first.
  pub async fn period_index(&self, region: &str) -> Result<Vec<i64>> {
    let url = format!(
      "{}/data/wow/mythic-keystone/period/index?namespace=dynamic-classic-{region}",
      self.base(region),
    );
    let wire: PeriodIndexResponse = self.get_json("period index", &url).await?;
    Ok(wire.into_period_ids())
  }

  // ── Seasons ───────────────────────────────────────────────────────────────

  pub async fn season_index(&self, region: &str) -> Result<SeasonIndex> {
    let url = format!(
      "{}/data/wow/mythic-keystone/season/index?namespace=dynamic-classic-{region}&locale=en_US",
      self.base(region),
    );
    let wire: SeasonIndexResponse = self.get_json("season index", &url).await?;
    Ok(wire.into())
  }

  pub async fn season_detail(&self, region: &str, season_id: i64) -> Result<SeasonRecord> {
    let url = format!(
      "{}/data/wow/mythic-keystone/season/{season_id}?namespace=dynamic-classic-{region}&locale=en_US",
      self.base(region),
    );
    let wire: SeasonDetailResponse = self.get_json("season detail", &url).await?;
    Ok(wire.into_record(region, season_id))
  }

  // ── Characters ────────────────────────────────────────────────────────────

  pub async fn fetch_character_summary(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> Result<CharacterSummary> {
    let url = self.profile_url(region, realm_slug, name, "");
    let wire: SummaryResponse = self.get_json("character summary", &url).await?;
    Ok(wire.into())
  }

  pub async fn fetch_character_equipment(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> Result<Vec<EquippedItem>> {
    let url = self.profile_url(region, realm_slug, name, "/equipment");
    let wire: EquipmentResponse = self.get_json("character equipment", &url).await?;
    Ok(wire.into_items())
  }

  /// The character's avatar URL, if the media endpoint lists one.
  pub async fn fetch_character_media(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> Result<Option<String>> {
    let url = self.profile_url(region, realm_slug, name, "/character-media");
    let wire: MediaResponse = self.get_json("character media", &url).await?;
    Ok(wire.avatar_url())
  }

  pub async fn fetch_character_achievements(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> Result<Vec<AchievementRecord>> {
    let url = self.profile_url(region, realm_slug, name, "/achievements");
    let wire: AchievementsResponse =
      self.get_json("character achievements", &url).await?;
    Ok(wire.into_records())
  }

  pub async fn fetch_character_status(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> Result<CharacterStatus> {
    let url = self.profile_url(region, realm_slug, name, "/status");
    let wire: StatusResponse = self.get_json("character status", &url).await?;
    Ok(wire.into())
  }

  /// Summary, equipment and media fetched concurrently. A missing media
  /// document leaves the avatar empty; any other failure fails the profile.
  pub async fn fetch_character_profile(
    &self,
    name: &str,
    realm_slug: &str,
    region: &str,
  ) -> Result<CharacterProfile> {
    let (summary, equipment, media) = tokio::join!(
      self.fetch_character_summary(name, realm_slug, region),
      self.fetch_character_equipment(name, realm_slug, region),
      self.fetch_character_media(name, realm_slug, region),
    );
    let avatar_url = match media {
      Ok(url) => url,
      Err(e) if e.is_not_found() => None,
      Err(e) => return Err(e),
    };
    Ok(CharacterProfile {
      summary: summary?,
      equipment: equipment?,
      avatar_url,
    })
  }
}

/// `Retry-After` in its delta-seconds form. Zero and unparseable values are
/// treated as absent.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
  headers
    .get(RETRY_AFTER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.trim().parse::<u64>().ok())
    .filter(|secs| *secs > 0)
    .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
  use reqwest::header::HeaderValue;

  use super::*;

  #[test]
  fn backoff_doubles_from_base() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.backoff(1), Duration::from_secs(1));
    assert_eq!(policy.backoff(2), Duration::from_secs(2));
    assert_eq!(policy.backoff(3), Duration::from_secs(4));
  }

  #[test]
  fn retry_after_accepts_only_positive_seconds() {
    let mut headers = HeaderMap::new();
    assert_eq!(parse_retry_after(&headers), None);
    headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
    assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
    headers.insert(RETRY_AFTER, HeaderValue::from_static("0"));
    assert_eq!(parse_retry_after(&headers), None);
    headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
    assert_eq!(parse_retry_after(&headers), None);
  }

  #[test]
  fn user_agent_names_the_crate_version() {
    assert!(USER_AGENT.starts_with("ookstats/"));
    assert!(USER_AGENT.len() > "ookstats/".len());
  }
}
