//! Identity reconciliation.
//!
//! Every valid player without a fingerprint is looked up at the vendor. Its
//! achievement milestones and class yield a fingerprint hash that survives
//! renames, realm transfers and faction changes. When the hash already
//! belongs to another player, that player's history is merged into the
//! candidate.
//!
//! Candidates run in bounded batches. The hash → owner map is shared behind
//! an async `RwLock`; the write lock only covers the in-memory insert, never
//! a store call.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
  time::{Duration, Instant},
};

use ookstats_core::{
  identity::{FingerprintCandidate, Milestones, PlayerFingerprint, fingerprint_hash},
  now_millis,
  store::RunStore,
};
use tokio::{sync::RwLock, task::JoinSet};

use crate::{Error, Result, VendorApi};

const PROGRESS_EVERY: usize = 200;
const PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

// ─── Outcomes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
  /// Neither stored details nor any run spec give a class.
  MissingClass,
  /// The vendor has no such character.
  Missing,
  /// The vendor reported the character invalid.
  Vendor(Option<String>),
  /// A milestone achievement is missing.
  Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityOutcome {
  Created,
  /// The hash belonged to `from`, whose history now belongs to the candidate.
  Merged { from: i64 },
  Invalid(InvalidReason),
  /// A transient vendor failure; the candidate is retried next run.
  Skipped(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityStats {
  pub candidates: usize,
  pub created:    usize,
  pub merged:     usize,
  pub invalid:    usize,
  pub skipped:    usize,
  /// Store failures.
  pub errors:     usize,
}

impl IdentityStats {
  fn record(&mut self, outcome: &IdentityOutcome) {
    match outcome {
      IdentityOutcome::Created => self.created += 1,
      IdentityOutcome::Merged { .. } => self.merged += 1,
      IdentityOutcome::Invalid(_) => self.invalid += 1,
      IdentityOutcome::Skipped(_) => self.skipped += 1,
    }
  }
}

/// Undo `claimant`'s claim on `hash`, handing it back to `previous`. A
/// claim taken over by another candidate in the meantime is left alone.
pub(crate) fn release_claim(
  owners: &mut HashMap<String, i64>,
  hash: String,
  claimant: i64,
  previous: Option<i64>,
) {
  if owners.get(&hash) != Some(&claimant) {
    return;
  }
  match previous {
    Some(owner) => owners.insert(hash, owner),
    None => owners.remove(&hash),
  };
}

// ─── Engine ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct IdentityOptions {
  /// Candidates resolved concurrently.
  pub batch_size:  usize,
  pub max_players: Option<usize>,
}

impl Default for IdentityOptions {
  fn default() -> Self {
    Self { batch_size: 25, max_players: None }
  }
}

pub struct IdentityEngine<S, V> {
  store:   S,
  vendor:  V,
  owners:  Arc<RwLock<HashMap<String, i64>>>,
  options: IdentityOptions,
}

impl<S: Clone, V: Clone> Clone for IdentityEngine<S, V> {
  fn clone(&self) -> Self {
    Self {
      store:   self.store.clone(),
      vendor:  self.vendor.clone(),
      owners:  Arc::clone(&self.owners),
      options: self.options,
    }
  }
}

impl<S, V> IdentityEngine<S, V>
where
  S: RunStore + Clone + 'static,
  V: VendorApi + Clone + 'static,
{
  /// Build an engine seeded with every fingerprint already stored.
  pub async fn load(store: S, vendor: V, options: IdentityOptions) -> Result<Self> {
    let owners = store.fingerprint_owners().await.map_err(Error::store)?;
    tracing::debug!(fingerprints = owners.len(), "loaded fingerprint owners");
    Ok(Self {
      store,
      vendor,
      owners: Arc::new(RwLock::new(owners)),
      options,
    })
  }

  /// The current owner of `hash`.
  pub async fn owner_of(&self, hash: &str) -> Option<i64> {
    self.owners.read().await.get(hash).copied()
  }

  /// Resolve every pending candidate.
  pub async fn run(&self) -> Result<IdentityStats> {
    let candidates = self
      .store
      .fingerprint_candidates(self.options.max_players)
      .await
      .map_err(Error::store)?;

    let mut seen = HashSet::new();
    let candidates: Vec<FingerprintCandidate> = candidates
      .into_iter()
      .filter(|c| seen.insert(c.player_id))
      .collect();

    let total = candidates.len();
    let mut stats = IdentityStats { candidates: total, ..IdentityStats::default() };
    tracing::info!(candidates = total, batch = self.options.batch_size, "resolving identities");

    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut done = 0usize;

    for chunk in candidates.chunks(self.options.batch_size.max(1)) {
      let mut tasks = JoinSet::new();
      for candidate in chunk.iter().cloned() {
        let engine = self.clone();
        tasks.spawn(async move {
          let player_id = candidate.player_id;
          (player_id, engine.resolve(candidate).await)
        });
      }

      while let Some(joined) = tasks.join_next().await {
        done += 1;
        match joined {
          Ok((_, Ok(outcome))) => stats.record(&outcome),
          Ok((player_id, Err(e))) => {
            stats.errors += 1;
            tracing::error!(player_id, error = %e, "identity write failed");
          }
          Err(e) => {
            stats.errors += 1;
            tracing::error!(error = %e, "identity task failed");
          }
        }

        if done % PROGRESS_EVERY == 0 || last_report.elapsed() >= PROGRESS_INTERVAL {
          last_report = Instant::now();
          tracing::info!(
            done,
            total,
            created = stats.created,
            merged = stats.merged,
            invalid = stats.invalid,
            skipped = stats.skipped,
            elapsed_s = started.elapsed().as_secs(),
            "identity progress"
          );
        }
      }
    }

    tracing::info!(
      candidates = stats.candidates,
      created = stats.created,
      merged = stats.merged,
      invalid = stats.invalid,
      skipped = stats.skipped,
      errors = stats.errors,
      elapsed_s = started.elapsed().as_secs(),
      "identity pass finished"
    );
    Ok(stats)
  }

  /// Walk one candidate through the status and achievement lookups.
  ///
  /// `Err` is reserved for store failures; vendor failures become outcomes.
  pub async fn resolve(&self, candidate: FingerprintCandidate) -> Result<IdentityOutcome> {
    let now = now_millis();
    let FingerprintCandidate { player_id, ref name, ref region, ref realm_slug, .. } = candidate;

    let Some(class_id) = candidate.class_id() else {
      self.invalidate(player_id, candidate.blizzard_character_id, now).await?;
      return Ok(IdentityOutcome::Invalid(InvalidReason::MissingClass));
    };

    let status = match self.vendor.status(name, realm_slug, region).await {
      Ok(status) => status,
      Err(e) if e.is_not_found() => {
        self.invalidate(player_id, candidate.blizzard_character_id, now).await?;
        return Ok(IdentityOutcome::Invalid(InvalidReason::Missing));
      }
      Err(e) => {
        tracing::debug!(player_id, error = %e, "status lookup failed; skipping");
        return Ok(IdentityOutcome::Skipped(e.to_string()));
      }
    };
    let character_id = status.character_id.or(candidate.blizzard_character_id);

    if !status.is_valid {
      self.invalidate(player_id, character_id, now).await?;
      return Ok(IdentityOutcome::Invalid(InvalidReason::Vendor(status.reason)));
    }

    let seen_name = status.name.unwrap_or_else(|| name.clone());
    let seen_realm = status.realm_slug.unwrap_or_else(|| realm_slug.clone());

    let achievements = match self.vendor.achievements(&seen_name, &seen_realm, region).await {
      Ok(a) => a,
      Err(e) if e.is_not_found() => {
        self.invalidate(player_id, character_id, now).await?;
        return Ok(IdentityOutcome::Invalid(InvalidReason::Missing));
      }
      Err(e) => {
        tracing::debug!(player_id, error = %e, "achievement lookup failed; skipping");
        return Ok(IdentityOutcome::Skipped(e.to_string()));
      }
    };

    let Ok(milestones) = Milestones::from_achievements(&achievements) else {
      self.invalidate(player_id, character_id, now).await?;
      return Ok(IdentityOutcome::Invalid(InvalidReason::Incomplete));
    };

    let hash = fingerprint_hash(class_id, &milestones);
    let previous = self.owners.write().await.insert(hash.clone(), player_id);
    let merge_from = previous.filter(|p| *p != player_id);

    let fingerprint = PlayerFingerprint {
      player_id,
      fingerprint_hash: hash.clone(),
      class_id,
      milestones,
      blizzard_character_id: character_id,
      last_seen_name: seen_name,
      last_seen_realm_slug: seen_realm,
      last_seen_timestamp: candidate.last_run_timestamp.unwrap_or(now),
      first_run_timestamp: candidate.first_run_timestamp.unwrap_or(now),
      created_at: now,
    };

    if let Err(e) = self.store.save_fingerprint(fingerprint, merge_from).await {
      release_claim(&mut *self.owners.write().await, hash, player_id, previous);
      return Err(Error::store(e));
    }

    Ok(match merge_from {
      Some(from) => {
        tracing::info!(player_id, from, "merged identity");
        IdentityOutcome::Merged { from }
      }
      None => IdentityOutcome::Created,
    })
  }

  async fn invalidate(
    &self,
    player_id: i64,
    character_id: Option<i64>,
    checked_at: i64,
  ) -> Result<()> {
    self
      .store
      .record_player_status(player_id, false, character_id, checked_at)
      .await
      .map_err(Error::store)
  }
}
