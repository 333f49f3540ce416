//! Character profile enrichment for ranked players.

use std::{
  collections::HashSet,
  time::{Duration, Instant},
};

use ookstats_core::{
  model::{CharacterProfile, ProfileCandidate, ProfileWriteStats},
  now_millis,
  slug::normalize_realm_slug,
  store::RunStore,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{AppConfig, Error, Result, VendorApi, deadline_token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
  Updated(ProfileWriteStats),
  /// Every candidate realm answered 404.
  NotFound,
  Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct ProfileSummary {
  pub candidates:          usize,
  pub processed:           usize,
  pub profiles:            usize,
  pub equipment_changed:   usize,
  pub equipment_unchanged: usize,
  pub not_found:           usize,
  pub errors:              usize,
  pub cancelled:           bool,
  pub duration:            Duration,
}

/// Refresh the profiles of ranked players whose details are missing or, with
/// `stale_after_hours` set, older than that.
pub async fn fetch_profiles<S, V>(
  store: &S,
  vendor: &V,
  config: &AppConfig,
  cancel: &CancellationToken,
) -> Result<ProfileSummary>
where
  S: RunStore + Clone + 'static,
  V: VendorApi + Clone + 'static,
{
  let started = Instant::now();
  let stale_before = config
    .stale_after_hours
    .map(|h| i64::try_from(h).unwrap_or(i64::MAX).saturating_mul(3_600_000))
    .map(|age| now_millis().saturating_sub(age));

  let candidates = store
    .profile_candidates(stale_before, config.max_players)
    .await
    .map_err(Error::store)?;

  let mut summary = ProfileSummary { candidates: candidates.len(), ..ProfileSummary::default() };
  if candidates.is_empty() {
    tracing::info!("no players need a profile refresh");
    return Ok(summary);
  }

  let batch = config.profile_batch.max(1);
  let batches = candidates.len().div_ceil(batch);
  tracing::info!(players = candidates.len(), batch, batches, "fetching player profiles");

  let token = deadline_token(cancel, config.profile_deadline());
  for (n, chunk) in candidates.chunks(batch).enumerate() {
    if token.is_cancelled() {
      break;
    }
    let snapshot = now_millis();
    let mut tasks = JoinSet::new();
    for candidate in chunk.iter().cloned() {
      let store = store.clone();
      let vendor = vendor.clone();
      tasks.spawn(async move {
        let player_id = candidate.player_id;
        (player_id, refresh_profile(&store, &vendor, candidate, snapshot).await)
      });
    }

    let before = summary.profiles;
    while let Some(joined) = tasks.join_next().await {
      summary.processed += 1;
      match joined {
        Ok((_, Ok(ProfileOutcome::Updated(stats)))) => {
          summary.profiles += stats.details_written;
          summary.equipment_changed += stats.equipment_changed;
          summary.equipment_unchanged += stats.equipment_unchanged;
        }
        Ok((player_id, Ok(ProfileOutcome::NotFound))) => {
          summary.not_found += 1;
          if config.verbose {
            tracing::info!(player_id, "profile not found on any realm");
          }
        }
        Ok((player_id, Ok(ProfileOutcome::Failed(message)))) => {
          summary.errors += 1;
          tracing::warn!(player_id, %message, "profile fetch failed");
        }
        Ok((player_id, Err(e))) => {
          summary.errors += 1;
          tracing::error!(player_id, error = %e, "profile write failed");
        }
        Err(e) => {
          summary.errors += 1;
          tracing::error!(error = %e, "profile task failed");
        }
      }
    }

    let minutes = started.elapsed().as_secs_f64() / 60.0;
    tracing::info!(
      batch = n + 1,
      batches,
      profiles = summary.profiles - before,
      processed = summary.processed,
      players_per_min = if minutes > 0.0 { summary.processed as f64 / minutes } else { 0.0 },
      "profile batch complete"
    );
  }

  summary.cancelled = token.is_cancelled();
  token.cancel();
  summary.duration = started.elapsed();
  tracing::info!(
    processed = summary.processed,
    profiles = summary.profiles,
    equipment_changed = summary.equipment_changed,
    not_found = summary.not_found,
    errors = summary.errors,
    cancelled = summary.cancelled,
    elapsed_s = summary.duration.as_secs(),
    "profile pass finished"
  );
  Ok(summary)
}

/// Fetch and store one player's profile.
///
/// The nominal realm is tried first. On a 404 the rest of the realm pool and
/// then the realm of the player's latest run are tried; the first answer
/// other than 404 decides the outcome.
pub async fn refresh_profile<S: RunStore, V: VendorApi>(
  store: &S,
  vendor: &V,
  candidate: ProfileCandidate,
  snapshot_timestamp: i64,
) -> Result<ProfileOutcome> {
  let ProfileCandidate { player_id, name, region, realm_slug } = candidate;
  let nominal = normalize_realm_slug(&region, &realm_slug);

  let profile = match lookup(vendor, &name, &nominal, &region).await {
    Lookup::Found(profile) => profile,
    Lookup::Failed(message) => return Ok(ProfileOutcome::Failed(message)),
    Lookup::NotFound => {
      let alternates = store
        .alternate_realm_slugs(player_id, region.clone(), nominal.clone())
        .await
        .map_err(Error::store)?;

      let mut tried = HashSet::from([nominal]);
      let mut found = None;
      for slug in alternates {
        let slug = normalize_realm_slug(&region, &slug);
        if !tried.insert(slug.clone()) {
          continue;
        }
        match lookup(vendor, &name, &slug, &region).await {
          Lookup::Found(profile) => {
            tracing::debug!(player_id, realm = %slug, "profile found on alternate realm");
            found = Some(profile);
            break;
          }
          Lookup::Failed(message) => return Ok(ProfileOutcome::Failed(message)),
          Lookup::NotFound => {}
        }
      }
      match found {
        Some(profile) => profile,
        None => return Ok(ProfileOutcome::NotFound),
      }
    }
  };

  let stats = store
    .save_character_profile(player_id, profile, snapshot_timestamp)
    .await
    .map_err(Error::store)?;
  Ok(ProfileOutcome::Updated(stats))
}

enum Lookup {
  Found(CharacterProfile),
  NotFound,
  Failed(String),
}

async fn lookup<V: VendorApi>(vendor: &V, name: &str, realm_slug: &str, region: &str) -> Lookup {
  match vendor.profile(name, realm_slug, region).await {
    Ok(profile) => Lookup::Found(profile),
    Err(e) if e.is_not_found() => Lookup::NotFound,
    Err(e) => Lookup::Failed(e.to_string()),
  }
}
