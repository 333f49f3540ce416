//! Season rows, period links and run season assignment.

use rusqlite::{Connection, params};

use ookstats_core::model::SeasonRecord;

/// Upsert `season`, link its periods and recompute the region's season end
/// timestamps. Returns the season row id.
pub(crate) fn sync_season(
  conn: &mut Connection,
  season: &SeasonRecord,
) -> rusqlite::Result<i64> {
  let first_period = season.period_ids.iter().copied().min();
  let last_period = season.period_ids.iter().copied().max();

  let tx = conn.transaction()?;
  let id: i64 = tx.query_row(
    "INSERT INTO seasons
       (season_number, region, start_timestamp, season_name, first_period_id, last_period_id)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT(season_number, region) DO UPDATE SET
       start_timestamp = excluded.start_timestamp,
       season_name     = excluded.season_name,
       first_period_id = COALESCE(excluded.first_period_id, seasons.first_period_id),
       last_period_id  = COALESCE(excluded.last_period_id, seasons.last_period_id)
     RETURNING id",
    params![
      season.season_number,
      season.region,
      season.start_timestamp,
      season.season_name,
      first_period,
      last_period,
    ],
    |r| r.get(0),
  )?;

  {
    let mut link = tx.prepare(
      "INSERT OR IGNORE INTO period_seasons (period_id, season_id) VALUES (?1, ?2)",
    )?;
    for period in &season.period_ids {
      link.execute(params![period, id])?;
    }
  }

  // A season ends where the next one in its region starts; the latest stays
  // open.
  tx.execute(
    "UPDATE seasons SET end_timestamp = (
       SELECT MIN(n.start_timestamp) FROM seasons n
       WHERE n.region = seasons.region
         AND n.start_timestamp > seasons.start_timestamp
     )
     WHERE region = ?1",
    [&season.region],
  )?;
  tx.commit()?;
  Ok(id)
}

/// Recompute `season_id` for every run from its realm's region windows.
/// Returns how many runs carry a season afterwards.
pub(crate) fn assign_run_seasons(conn: &Connection) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE challenge_runs SET season_id = (
       SELECT s.season_number
       FROM seasons s
       JOIN realms r ON r.region = s.region
       WHERE r.id = challenge_runs.realm_id
         AND s.start_timestamp <= challenge_runs.completed_timestamp
         AND (s.end_timestamp IS NULL OR challenge_runs.completed_timestamp < s.end_timestamp)
       ORDER BY s.start_timestamp DESC
       LIMIT 1
     )",
    [],
  )?;
  let assigned: i64 = conn.query_row(
    "SELECT COUNT(*) FROM challenge_runs WHERE season_id IS NOT NULL",
    [],
    |r| r.get(0),
  )?;
  Ok(usize::try_from(assigned).unwrap_or_default())
}
