//! Leaderboard ingestion: fetch status rows, batched run persistence and
//! fetch metadata.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension as _, Transaction, params};

use ookstats_core::{
  identity::team_signature,
  model::{
    FetchMetadata, FetchStatusRecord, IngestStats, LeaderboardBatchItem,
    LeaderboardRun,
  },
  slug::normalize_realm_slug,
};

use crate::reference;

// ─── Status ──────────────────────────────────────────────────────────────────

pub(crate) fn record_fetch_status(
  conn: &Connection,
  record: &FetchStatusRecord,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO fetch_status
       (region, realm_slug, dungeon_id, period_id, status, http_status, checked_at, message)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT(region, realm_slug, dungeon_id, period_id) DO UPDATE SET
       status      = excluded.status,
       http_status = excluded.http_status,
       checked_at  = excluded.checked_at,
       message     = excluded.message",
    params![
      record.region,
      record.realm_slug,
      record.dungeon_id,
      record.period_id,
      record.status.as_str(),
      record.http_status,
      record.checked_at,
      record.message,
    ],
  )?;
  Ok(())
}

pub(crate) fn record_fetch_metadata(
  conn: &Connection,
  metadata: &FetchMetadata,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO api_fetch_metadata
       (fetch_type, last_fetch_timestamp, last_successful_fetch, runs_fetched, players_fetched)
     VALUES (?1, ?2, ?2, ?3, ?4)
     ON CONFLICT(fetch_type) DO UPDATE SET
       last_fetch_timestamp  = excluded.last_fetch_timestamp,
       last_successful_fetch = excluded.last_successful_fetch,
       runs_fetched          = excluded.runs_fetched,
       players_fetched       = excluded.players_fetched",
    params![
      metadata.fetch_type,
      metadata.timestamp,
      metadata.runs_fetched,
      metadata.players_fetched,
    ],
  )?;
  Ok(())
}

// ─── Batches ─────────────────────────────────────────────────────────────────

/// An item that survived the pre-check, with its resolved keys.
struct Pending<'a> {
  item:        &'a LeaderboardBatchItem,
  dungeon_id:  i64,
  payload_max: i64,
}

pub(crate) fn ingest_batch(
  conn: &mut Connection,
  items: &[LeaderboardBatchItem],
) -> rusqlite::Result<IngestStats> {
  let mut stats = IngestStats::default();

  // Read-only pre-check, before any write lock is taken.
  let mut pending = Vec::with_capacity(items.len());
  for item in items {
    let Some(payload_max) = item.leaderboard.max_completed_timestamp() else {
      stats.skipped += 1;
      continue;
    };
    let dungeon_id =
      reference::dungeon_id(conn, &item.dungeon.slug)?.unwrap_or(item.dungeon.id);
    let realm_id = reference::realm_id(conn, &item.region, &item.realm_slug)?;
    let db_max = match realm_id {
      Some(realm_id) => stored_max_completed(conn, realm_id, dungeon_id)?,
      None => 0,
    };
    let marker = fetch_marker(conn, &item.realm_slug, dungeon_id, item.period_id)?;
    if payload_max <= db_max.max(marker) {
      tracing::trace!(
        realm = %item.realm_slug,
        dungeon = %item.dungeon.slug,
        period = item.period_id,
        "no new runs; skipping"
      );
      stats.skipped += 1;
      continue;
    }
    pending.push(Pending { item, dungeon_id, payload_max });
  }

  if pending.is_empty() {
    return Ok(stats);
  }

  let tx = conn.transaction()?;
  {
    let mut realms: HashMap<(String, String), i64> = HashMap::new();
    for p in &pending {
      let item = p.item;
      let run_realm = cached_realm(&tx, &mut realms, &item.region, &item.realm_slug)?;
      for run in &item.leaderboard.runs {
        insert_run(&tx, &mut realms, &mut stats, p, run_realm, run)?;
      }
      tx.execute(
        "INSERT INTO api_fetch_markers (realm_slug, dungeon_id, period_id, last_completed_ts)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(realm_slug, dungeon_id, period_id) DO UPDATE SET
           last_completed_ts = MAX(api_fetch_markers.last_completed_ts, excluded.last_completed_ts)",
        params![item.realm_slug, p.dungeon_id, item.period_id, p.payload_max],
      )?;
      stats.processed += 1;
    }
  }
  tx.commit()?;
  Ok(stats)
}

fn stored_max_completed(
  conn: &Connection,
  realm_id: i64,
  dungeon_id: i64,
) -> rusqlite::Result<i64> {
  conn.query_row(
    "SELECT COALESCE(MAX(completed_timestamp), 0) FROM challenge_runs
     WHERE realm_id = ?1 AND dungeon_id = ?2",
    params![realm_id, dungeon_id],
    |r| r.get(0),
  )
}

fn fetch_marker(
  conn: &Connection,
  realm_slug: &str,
  dungeon_id: i64,
  period_id: i64,
) -> rusqlite::Result<i64> {
  Ok(
    conn
      .query_row(
        "SELECT last_completed_ts FROM api_fetch_markers
         WHERE realm_slug = ?1 AND dungeon_id = ?2 AND period_id = ?3",
        params![realm_slug, dungeon_id, period_id],
        |r| r.get(0),
      )
      .optional()?
      .unwrap_or(0),
  )
}

fn cached_realm(
  tx: &Transaction<'_>,
  cache: &mut HashMap<(String, String), i64>,
  region: &str,
  slug: &str,
) -> rusqlite::Result<i64> {
  let key = (region.to_owned(), slug.to_owned());
  if let Some(id) = cache.get(&key) {
    return Ok(*id);
  }
  let id = reference::ensure_realm(tx, region, slug)?;
  cache.insert(key, id);
  Ok(id)
}

/// Season number whose window in `region` contains `ts`.
pub(crate) fn season_for(
  conn: &Connection,
  region: &str,
  ts: i64,
) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row(
      "SELECT season_number FROM seasons
       WHERE region = ?1
         AND start_timestamp <= ?2
         AND (end_timestamp IS NULL OR ?2 < end_timestamp)
       ORDER BY start_timestamp DESC
       LIMIT 1",
      params![region, ts],
      |r| r.get(0),
    )
    .optional()
}

fn insert_run(
  tx: &Transaction<'_>,
  realms: &mut HashMap<(String, String), i64>,
  stats: &mut IngestStats,
  pending: &Pending<'_>,
  run_realm: i64,
  run: &LeaderboardRun,
) -> rusqlite::Result<()> {
  let item = pending.item;
  let ids: Vec<i64> = run.members.iter().filter_map(|m| m.id).collect();
  if ids.is_empty() {
    return Ok(());
  }
  let signature = team_signature(&ids);
  let season = season_for(tx, &item.region, run.completed_timestamp)?;

  let inserted = tx.execute(
    "INSERT OR IGNORE INTO challenge_runs
       (duration, completed_timestamp, keystone_level, dungeon_id, realm_id, period_id,
        period_start_timestamp, period_end_timestamp, team_signature, season_id)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    params![
      run.duration,
      run.completed_timestamp,
      run.keystone_level,
      pending.dungeon_id,
      run_realm,
      item.period_id,
      item.leaderboard.period_start_timestamp,
      item.leaderboard.period_end_timestamp,
      signature,
      season,
    ],
  )?;
  if inserted == 0 {
    return Ok(());
  }
  let run_id = tx.last_insert_rowid();
  stats.runs_inserted += 1;

  for member in &run.members {
    let Some(player_id) = member.id else { continue };
    let realm_id = match member.realm_slug.as_deref().filter(|s| !s.is_empty()) {
      Some(slug) => {
        let slug = normalize_realm_slug(&item.region, slug);
        cached_realm(tx, realms, &item.region, &slug)?
      }
      None => run_realm,
    };
    upsert_player(tx, stats, player_id, &member.name, realm_id)?;

    let spec = member.spec_id.filter(|s| *s > 0);
    let faction = member.faction.as_deref().filter(|f| !f.is_empty());
    stats.members_inserted += tx.execute(
      "INSERT OR IGNORE INTO run_members (run_id, player_id, spec_id, faction)
       VALUES (?1, ?2, ?3, ?4)",
      params![run_id, player_id, spec, faction],
    )?;
  }
  Ok(())
}

fn upsert_player(
  tx: &Transaction<'_>,
  stats: &mut IngestStats,
  player_id: i64,
  name: &str,
  realm_id: i64,
) -> rusqlite::Result<()> {
  let name_lower = name.to_lowercase();

  let holder: Option<i64> = tx
    .query_row(
      "SELECT id FROM players
       WHERE name_lower = ?1 AND realm_id = ?2 AND id != ?3 AND is_valid = 1
       LIMIT 1",
      params![name_lower, realm_id, player_id],
      |r| r.get(0),
    )
    .optional()?;
  if let Some(holder) = holder {
    tracing::debug!(player_id, holder, name, realm_id, "name already held by another player");
    stats.identity_conflicts += 1;
  }

  let exists = tx
    .query_row("SELECT 1 FROM players WHERE id = ?1", [player_id], |_| Ok(()))
    .optional()?
    .is_some();

  tx.execute(
    "INSERT INTO players (id, blizzard_character_id, name, name_lower, realm_id, is_valid)
     VALUES (?1, ?1, ?2, ?3, ?4, 1)
     ON CONFLICT(id) DO UPDATE SET
       name       = excluded.name,
       name_lower = excluded.name_lower,
       realm_id   = excluded.realm_id
     WHERE players.name IS NOT excluded.name
        OR players.name_lower IS NOT excluded.name_lower
        OR players.realm_id IS NOT excluded.realm_id",
    params![player_id, name, name_lower, realm_id],
  )?;
  if !exists {
    stats.players_inserted += 1;
  }
  Ok(())
}
