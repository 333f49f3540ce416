//! [`SqliteStore`], the SQLite implementation of [`RunStore`].

use std::{collections::HashMap, path::Path, sync::Arc};

use ookstats_core::{
  identity::{FingerprintCandidate, PlayerFingerprint},
  model::{
    CharacterProfile, DungeonInfo, FetchMetadata, FetchStatusRecord, IngestStats,
    LeaderboardBatchItem, ProfileCandidate, ProfileWriteStats, RealmInfo,
    SeasonRecord,
  },
  store::RunStore,
};

use crate::{
  Error, Result, identity, ingest, migrate, profiles, reference,
  retry::with_busy_retry,
  schema::{INDEXES, SCHEMA, SCHEMA_VERSION},
  seasons,
};

/// `LIMIT` operand for an optional cap; SQLite treats `-1` as unbounded.
pub(crate) fn sql_limit(limit: Option<usize>) -> i64 {
  limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An ookstats run store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is shared.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, then bring its schema up to date.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::from_connection(conn).await
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::from_connection(conn).await
  }

  /// Wrap an already-open connection and initialise its schema.
  pub async fn from_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    for &(step, run) in migrate::STEPS {
      self
        .conn
        .call(move |conn| {
          run(conn)?;
          Ok(())
        })
        .await
        .map_err(|source| Error::Migration { step, source })?;
    }

    for &index in INDEXES {
      let created = self
        .conn
        .call(move |conn| {
          conn.execute_batch(index)?;
          Ok(())
        })
        .await;
      if let Err(e) = created {
        tracing::warn!(error = %e, index, "failed to create index");
      }
    }

    self
      .conn
      .call(|conn| {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread.
  pub(crate) async fn call<R, F>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }

  /// Like [`Self::call`], retrying while the database is locked. `f` may run
  /// more than once.
  pub(crate) async fn write<R, F>(&self, f: F) -> Result<R>
  where
    F: Fn(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + Sync + 'static,
    R: Send + 'static,
  {
    let f = Arc::new(f);
    with_busy_retry(|| {
      let f = Arc::clone(&f);
      self.call(move |conn| f(conn))
    })
    .await
  }
}

// ─── RunStore impl ───────────────────────────────────────────────────────────

impl RunStore for SqliteStore {
  type Error = Error;

  // ── Reference data ────────────────────────────────────────────────────────

  async fn ensure_reference_data(
    &self,
    realms: Vec<RealmInfo>,
    dungeons: Vec<DungeonInfo>,
  ) -> Result<()> {
    self
      .write(move |conn| reference::ensure_reference_data(conn, &realms, &dungeons))
      .await
  }

  // ── Ingestion ─────────────────────────────────────────────────────────────

  async fn record_fetch_status(&self, record: FetchStatusRecord) -> Result<()> {
    self
      .write(move |conn| ingest::record_fetch_status(conn, &record))
      .await
  }

  async fn ingest_batch(&self, items: Vec<LeaderboardBatchItem>) -> Result<IngestStats> {
    self.write(move |conn| ingest::ingest_batch(conn, &items)).await
  }

  async fn record_fetch_metadata(&self, metadata: FetchMetadata) -> Result<()> {
    self
      .write(move |conn| ingest::record_fetch_metadata(conn, &metadata))
      .await
  }

  // ── Seasons ───────────────────────────────────────────────────────────────

  async fn sync_season(&self, season: SeasonRecord) -> Result<i64> {
    self.write(move |conn| seasons::sync_season(conn, &season)).await
  }

  async fn assign_run_seasons(&self) -> Result<usize> {
    self.write(|conn| seasons::assign_run_seasons(conn)).await
  }

  // ── Identity ──────────────────────────────────────────────────────────────

  async fn fingerprint_candidates(
    &self,
    limit: Option<usize>,
  ) -> Result<Vec<FingerprintCandidate>> {
    self
      .call(move |conn| identity::fingerprint_candidates(conn, limit))
      .await
  }

  async fn fingerprint_owners(&self) -> Result<HashMap<String, i64>> {
    self.call(|conn| identity::fingerprint_owners(conn)).await
  }

  async fn record_player_status(
    &self,
    player_id: i64,
    is_valid: bool,
    blizzard_character_id: Option<i64>,
    checked_at: i64,
  ) -> Result<()> {
    self
      .write(move |conn| {
        identity::record_player_status(
          conn,
          player_id,
          is_valid,
          blizzard_character_id,
          checked_at,
        )
      })
      .await
  }

  async fn save_fingerprint(
    &self,
    fingerprint: PlayerFingerprint,
    merge_from: Option<i64>,
  ) -> Result<()> {
    self
      .write(move |conn| identity::save_fingerprint(conn, &fingerprint, merge_from))
      .await
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn profile_candidates(
    &self,
    stale_before: Option<i64>,
    limit: Option<usize>,
  ) -> Result<Vec<ProfileCandidate>> {
    self
      .call(move |conn| profiles::profile_candidates(conn, stale_before, limit))
      .await
  }

  async fn alternate_realm_slugs(
    &self,
    player_id: i64,
    region: String,
    realm_slug: String,
  ) -> Result<Vec<String>> {
    self
      .call(move |conn| {
        profiles::alternate_realm_slugs(conn, player_id, &region, &realm_slug)
      })
      .await
  }

  async fn save_character_profile(
    &self,
    player_id: i64,
    profile: CharacterProfile,
    snapshot_timestamp: i64,
  ) -> Result<ProfileWriteStats> {
    self
      .write(move |conn| {
        profiles::save_character_profile(conn, player_id, &profile, snapshot_timestamp)
      })
      .await
  }
}
