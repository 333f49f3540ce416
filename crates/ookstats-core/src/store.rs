//! The `RunStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `ookstats-store-sqlite`).
//! The fetch, identity and profile stages in `ookstats-pipeline` depend on
//! this abstraction, not on any concrete backend.

use std::{collections::HashMap, future::Future};

use crate::{
  identity::{FingerprintCandidate, PlayerFingerprint},
  model::{
    CharacterProfile, DungeonInfo, FetchMetadata, FetchStatusRecord, IngestStats,
    LeaderboardBatchItem, ProfileCandidate, ProfileWriteStats, RealmInfo,
    SeasonRecord,
  },
};

/// Abstraction over the ookstats run store.
///
/// Runs and memberships are append-only. Reference rows are upserted and
/// never deleted.
///
/// All methods return `Send` futures so the store can be shared across tokio
/// tasks.
pub trait RunStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reference data ────────────────────────────────────────────────────

  /// Insert any missing realms and dungeons. Existing rows are kept, except
  /// that a realm's missing parent link is filled in.
  fn ensure_reference_data(
    &self,
    realms: Vec<RealmInfo>,
    dungeons: Vec<DungeonInfo>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Ingestion ─────────────────────────────────────────────────────────

  /// Upsert the outcome of one leaderboard request.
  fn record_fetch_status(
    &self,
    record: FetchStatusRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Persist a batch of leaderboards in one transaction.
  ///
  /// Items whose newest run is not newer than what is already stored for the
  /// endpoint are skipped. Any failure rolls back the whole batch.
  fn ingest_batch(
    &self,
    items: Vec<LeaderboardBatchItem>,
  ) -> impl Future<Output = Result<IngestStats, Self::Error>> + Send + '_;

  fn record_fetch_metadata(
    &self,
    metadata: FetchMetadata,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Seasons ───────────────────────────────────────────────────────────

  /// Upsert a season, link its periods and close the region's previous
  /// season at this season's start. Returns the season row id.
  fn sync_season(
    &self,
    season: SeasonRecord,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Recompute `season_id` for every stored run. Returns the number of runs
  /// that have a season afterwards.
  fn assign_run_seasons(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Identity ──────────────────────────────────────────────────────────

  /// Valid players without a fingerprint, most recently active first.
  fn fingerprint_candidates(
    &self,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<FingerprintCandidate>, Self::Error>> + Send + '_;

  /// Every stored fingerprint hash and the player that owns it.
  fn fingerprint_owners(
    &self,
  ) -> impl Future<Output = Result<HashMap<String, i64>, Self::Error>> + Send + '_;

  /// Record the outcome of a vendor status check.
  fn record_player_status(
    &self,
    player_id: i64,
    is_valid: bool,
    blizzard_character_id: Option<i64>,
    checked_at: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Store a fingerprint and mark its player valid. When `merge_from` names
  /// the previous owner of the hash, its run history moves to the new
  /// player, it is invalidated and its fingerprint removed, all in the same
  /// transaction. Runs that turn into duplicates of an existing run under
  /// the new membership are dropped.
  fn save_fingerprint(
    &self,
    fingerprint: PlayerFingerprint,
    merge_from: Option<i64>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Players with complete coverage in some season whose details are
  /// missing or older than `stale_before`.
  fn profile_candidates(
    &self,
    stale_before: Option<i64>,
    limit: Option<usize>,
  ) -> impl Future<Output = Result<Vec<ProfileCandidate>, Self::Error>> + Send + '_;

  /// Other realm slugs a character may be found under: the rest of its realm
  /// pool, then the realm of its most recent run.
  fn alternate_realm_slugs(
    &self,
    player_id: i64,
    region: String,
    realm_slug: String,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Write character details and any equipment slots whose content changed.
  fn save_character_profile(
    &self,
    player_id: i64,
    profile: CharacterProfile,
    snapshot_timestamp: i64,
  ) -> impl Future<Output = Result<ProfileWriteStats, Self::Error>> + Send + '_;
}
