//! Fingerprint candidates, player status and fingerprint merges.

use std::collections::HashMap;

use rusqlite::{Connection, OptionalExtension as _, Transaction, params};

use ookstats_core::identity::{FingerprintCandidate, PlayerFingerprint, team_signature};

use crate::store::sql_limit;

pub(crate) fn fingerprint_candidates(
  conn: &Connection,
  limit: Option<usize>,
) -> rusqlite::Result<Vec<FingerprintCandidate>> {
  let mut stmt = conn.prepare(
    "WITH activity AS (
       SELECT rm.player_id,
              MIN(cr.completed_timestamp) AS first_ts,
              MAX(cr.completed_timestamp) AS last_ts
         FROM run_members rm
         JOIN challenge_runs cr ON cr.id = rm.run_id
        GROUP BY rm.player_id
     ),
     latest_spec AS (
       SELECT player_id, spec_id FROM (
         SELECT rm.player_id, rm.spec_id,
                ROW_NUMBER() OVER (
                  PARTITION BY rm.player_id
                  ORDER BY cr.completed_timestamp DESC, rm.run_id DESC
                ) AS n
           FROM run_members rm
           JOIN challenge_runs cr ON cr.id = rm.run_id
          WHERE rm.spec_id IS NOT NULL
       ) WHERE n = 1
     )
     SELECT p.id, p.name, r.region, r.slug, p.blizzard_character_id, pd.class_id,
            ls.spec_id, a.first_ts, a.last_ts
     FROM players p
     JOIN realms r ON r.id = p.realm_id
     LEFT JOIN player_details pd ON pd.player_id = p.id
     LEFT JOIN player_fingerprints pf ON pf.player_id = p.id
     LEFT JOIN activity a ON a.player_id = p.id
     LEFT JOIN latest_spec ls ON ls.player_id = p.id
     WHERE p.is_valid = 1 AND pf.player_id IS NULL
     ORDER BY a.last_ts IS NULL, a.last_ts DESC, p.id
     LIMIT ?1",
  )?;
  let rows = stmt.query_map([sql_limit(limit)], |r| {
    Ok(FingerprintCandidate {
      player_id:             r.get(0)?,
      name:                  r.get(1)?,
      region:                r.get(2)?,
      realm_slug:            r.get(3)?,
      blizzard_character_id: r.get(4)?,
      details_class_id:      r.get(5)?,
      latest_spec_id:        r.get(6)?,
      first_run_timestamp:   r.get(7)?,
      last_run_timestamp:    r.get(8)?,
    })
  })?;
  rows.collect()
}

pub(crate) fn fingerprint_owners(conn: &Connection) -> rusqlite::Result<HashMap<String, i64>> {
  let mut stmt = conn.prepare(
    "SELECT fingerprint_hash, player_id FROM player_fingerprints
     WHERE fingerprint_hash IS NOT NULL",
  )?;
  let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
  rows.collect()
}

pub(crate) fn record_player_status(
  conn: &Connection,
  player_id: i64,
  is_valid: bool,
  blizzard_character_id: Option<i64>,
  checked_at: i64,
) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE players SET
       is_valid              = ?2,
       status_checked_at     = ?3,
       blizzard_character_id = COALESCE(?4, blizzard_character_id)
     WHERE id = ?1",
    params![player_id, is_valid, checked_at, blizzard_character_id],
  )?;
  Ok(())
}

/// Store `fingerprint` and mark its player valid, first folding
/// `merge_from`'s history into that player.
pub(crate) fn save_fingerprint(
  conn: &mut Connection,
  fingerprint: &PlayerFingerprint,
  merge_from: Option<i64>,
) -> rusqlite::Result<()> {
  let new_id = fingerprint.player_id;
  let tx = conn.transaction()?;

  if let Some(old_id) = merge_from.filter(|old| *old != new_id) {
    let affected = run_ids_of(&tx, old_id)?;
    // Runs both players appear in keep the new player's row.
    let moved = tx.execute(
      "UPDATE OR IGNORE run_members SET player_id = ?1 WHERE player_id = ?2",
      params![new_id, old_id],
    )?;
    tx.execute("DELETE FROM run_members WHERE player_id = ?1", [old_id])?;

    let mut collapsed = 0usize;
    for run_id in affected {
      if let Some(kept) = resign_run(&tx, run_id)? {
        collapsed += 1;
        tracing::debug!(run_id, kept, "merged run duplicates an existing run");
      }
    }

    tx.execute("UPDATE players SET is_valid = 0 WHERE id = ?1", [old_id])?;
    tx.execute("DELETE FROM player_fingerprints WHERE player_id = ?1", [old_id])?;
    tracing::info!(from = old_id, to = new_id, moved, collapsed, "merged player history");
  }

  tx.execute(
    "UPDATE players SET
       is_valid              = 1,
       status_checked_at     = ?2,
       blizzard_character_id = COALESCE(?3, blizzard_character_id)
     WHERE id = ?1",
    params![new_id, fingerprint.created_at, fingerprint.blizzard_character_id],
  )?;

  tx.execute(
    "INSERT INTO player_fingerprints
       (player_id, fingerprint_hash, class_id, level85_timestamp, level90_timestamp,
        earliest_heroic_timestamp, last_seen_name, last_seen_realm_slug,
        last_seen_timestamp, first_run_timestamp, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
     ON CONFLICT(player_id) DO UPDATE SET
       fingerprint_hash          = excluded.fingerprint_hash,
       class_id                  = excluded.class_id,
       level85_timestamp         = excluded.level85_timestamp,
       level90_timestamp         = excluded.level90_timestamp,
       earliest_heroic_timestamp = excluded.earliest_heroic_timestamp,
       last_seen_name            = excluded.last_seen_name,
       last_seen_realm_slug      = excluded.last_seen_realm_slug,
       last_seen_timestamp       = excluded.last_seen_timestamp,
       first_run_timestamp       = excluded.first_run_timestamp",
    params![
      new_id,
      fingerprint.fingerprint_hash,
      fingerprint.class_id,
      fingerprint.milestones.level85,
      fingerprint.milestones.level90,
      fingerprint.milestones.earliest_heroic,
      fingerprint.last_seen_name,
      fingerprint.last_seen_realm_slug,
      fingerprint.last_seen_timestamp,
      fingerprint.first_run_timestamp,
      fingerprint.created_at,
    ],
  )?;
  tx.commit()
}

fn run_ids_of(tx: &Transaction<'_>, player_id: i64) -> rusqlite::Result<Vec<i64>> {
  let mut stmt = tx.prepare("SELECT DISTINCT run_id FROM run_members WHERE player_id = ?1")?;
  let rows = stmt.query_map([player_id], |r| r.get(0))?;
  rows.collect()
}

/// Recompute the team signature of `run_id` from its members.
///
/// When another run with the same time, dungeon, duration and realm already
/// carries the new signature, `run_id` is the same run seen under the old
/// identity: it is deleted along with its members and derived rows, and the
/// id of the surviving run is returned.
fn resign_run(tx: &Transaction<'_>, run_id: i64) -> rusqlite::Result<Option<i64>> {
  let members = {
    let mut stmt = tx.prepare("SELECT player_id FROM run_members WHERE run_id = ?1")?;
    let rows = stmt.query_map([run_id], |r| r.get::<_, i64>(0))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()?
  };
  let signature = team_signature(&members);

  let kept: Option<i64> = tx
    .query_row(
      "SELECT other.id
         FROM challenge_runs cr
         JOIN challenge_runs other
           ON other.completed_timestamp = cr.completed_timestamp
          AND other.dungeon_id          = cr.dungeon_id
          AND other.duration            = cr.duration
          AND other.realm_id            = cr.realm_id
          AND other.id                 <> cr.id
        WHERE cr.id = ?1 AND other.team_signature = ?2",
      params![run_id, signature],
      |r| r.get(0),
    )
    .optional()?;

  match kept {
    Some(kept) => {
      tx.execute("DELETE FROM run_members WHERE run_id = ?1", [run_id])?;
      tx.execute("DELETE FROM run_rankings WHERE run_id = ?1", [run_id])?;
      tx.execute("DELETE FROM player_best_runs WHERE run_id = ?1", [run_id])?;
      tx.execute("DELETE FROM challenge_runs WHERE id = ?1", [run_id])?;
      Ok(Some(kept))
    }
    None => {
      tx.execute(
        "UPDATE challenge_runs SET team_signature = ?2 WHERE id = ?1",
        params![run_id, signature],
      )?;
      Ok(None)
    }
  }
}
