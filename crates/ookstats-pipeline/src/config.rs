//! Runtime configuration shared by every pipeline stage.
//!
//! Deserialised by the binary from an optional TOML file and `OOKSTATS_*`
//! environment variables, then patched with command-line overrides. Every
//! field has a default so an empty source is a valid configuration.

use std::{path::PathBuf, time::Duration};

use ookstats_blizzard::ClientConfig;
use serde::Deserialize;

use crate::{Error, Result};

// ─── AppConfig ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub db_file: PathBuf,
  pub verbose: bool,

  // ── Sweep filters ──
  /// Regions to include; empty means all.
  pub regions:  Vec<String>,
  /// Realm slugs to include; empty means all.
  pub realms:   Vec<String>,
  /// Dungeon ids or slugs to include; empty means all.
  pub dungeons: Vec<String>,
  /// Period list such as `"1020-1036,1040"`. Empty asks the vendor.
  pub periods:  String,

  // ── Vendor client ──
  pub concurrency:          usize,
  pub request_timeout_secs: u64,

  // ── Ingestion ──
  /// Leaderboards per ingestion transaction.
  pub batch_size:          usize,
  pub fetch_deadline_secs: u64,

  // ── Identity and profiles ──
  pub identity_batch:        usize,
  pub profile_batch:         usize,
  pub profile_deadline_secs: u64,
  pub max_players:           Option<usize>,
  /// Refresh profiles older than this; `None` only fetches missing ones.
  pub stale_after_hours:     Option<u64>,
  pub skip_profiles:         bool,

  // ── Static output ──
  pub out:          PathBuf,
  pub page_size:    usize,
  pub shard_size:   usize,
  pub workers:      usize,
  pub players:      bool,
  pub leaderboards: bool,
  pub search:       bool,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      db_file:               PathBuf::from("local.db"),
      verbose:               false,
      regions:               Vec::new(),
      realms:                Vec::new(),
      dungeons:              Vec::new(),
      periods:               String::new(),
      concurrency:           ookstats_blizzard::client::DEFAULT_CONCURRENCY,
      request_timeout_secs:  15,
      batch_size:            10,
      fetch_deadline_secs:   45 * 60,
      identity_batch:        25,
      profile_batch:         20,
      profile_deadline_secs: 30 * 60,
      max_players:           None,
      stale_after_hours:     None,
      skip_profiles:         false,
      out:                   PathBuf::from("public"),
      page_size:             25,
      shard_size:            5000,
      workers:               10,
      players:               true,
      leaderboards:          true,
      search:                true,
    }
  }
}

impl AppConfig {
  pub fn client_config(&self) -> ClientConfig {
    ClientConfig {
      concurrency: self.concurrency.max(1),
      timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
      ..ClientConfig::default()
    }
  }

  /// The configured period ids, newest first.
  pub fn period_ids(&self) -> Result<Vec<i64>> {
    parse_periods(&self.periods)
  }

  /// Regions to process: the configured ones, else every known region.
  pub fn region_list(&self) -> Vec<String> {
    if self.regions.is_empty() {
      ookstats_core::wow::DEFAULT_REGIONS
        .iter()
        .map(|r| (*r).to_owned())
        .collect()
    } else {
      self.regions.iter().map(|r| r.trim().to_lowercase()).collect()
    }
  }

  pub fn fetch_deadline(&self) -> Duration {
    Duration::from_secs(self.fetch_deadline_secs)
  }

  pub fn profile_deadline(&self) -> Duration {
    Duration::from_secs(self.profile_deadline_secs)
  }
}

/// Parse `"1020-1036,1040"` into distinct ids, newest first. Reversed ranges
/// are accepted.
pub fn parse_periods(spec: &str) -> Result<Vec<i64>> {
  let invalid = || Error::InvalidPeriods(spec.to_owned());
  let mut ids = Vec::new();

  for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
    match part.split_once('-') {
      Some((lo, hi)) => {
        let lo: i64 = lo.trim().parse().map_err(|_| invalid())?;
        let hi: i64 = hi.trim().parse().map_err(|_| invalid())?;
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        ids.extend(lo..=hi);
      }
      None => ids.push(part.parse().map_err(|_| invalid())?),
    }
  }

  if ids.iter().any(|id| *id <= 0) {
    return Err(invalid());
  }
  ids.sort_unstable_by(|a, b| b.cmp(a));
  ids.dedup();
  Ok(ids)
}
