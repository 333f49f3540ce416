//! Ranking materialization.
//!
//! The rebuild truncates and refills `run_rankings`, `player_best_runs` and
//! `player_profiles` in a single write transaction. Ranks are row numbers
//! over `(duration, completed_timestamp, id)`; brackets follow
//! [`Bracket::for_rank`], expressed as a SQL `CASE` built from the same
//! threshold table so both agree.

use rusqlite::{Connection, Transaction, params};

use ookstats_core::{
  ranking::{BRACKET_THRESHOLDS, Bracket, FILTERED_SUFFIX, RankingType},
  wow::SPECS,
};

use crate::{Error, Result, SqliteStore};

/// Pool key of realm alias `r`.
const POOL: &str = "COALESCE(NULLIF(r.parent_realm_slug, ''), r.slug)";

/// Row counts produced by one rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
  pub run_rankings:   usize,
  pub best_runs:      usize,
  pub profiles:       usize,
  pub ranked_players: usize,
  /// Newest completion in the run table; stamped on every derived row.
  pub computed_at:    i64,
}

impl SqliteStore {
  /// Rebuild every derived ranking table from the run table, then `VACUUM`.
  ///
  /// Fails with [`Error::NoRuns`] when there is nothing to rank.
  pub async fn rebuild_rankings(&self) -> Result<RebuildStats> {
    let stats = self.write(rebuild).await?.ok_or(Error::NoRuns)?;
    tracing::info!(
      run_rankings = stats.run_rankings,
      best_runs = stats.best_runs,
      profiles = stats.profiles,
      ranked_players = stats.ranked_players,
      "rankings rebuilt"
    );

    let vacuum = self
      .call(|conn| {
        conn.execute_batch("VACUUM")?;
        Ok(())
      })
      .await;
    if let Err(e) = vacuum {
      tracing::warn!(error = %e, "VACUUM failed");
    }
    Ok(stats)
  }
}

// ─── SQL builders ────────────────────────────────────────────────────────────

/// `CASE` expression mapping a rank to its bracket label.
fn bracket_case(rank: &str, total: &str, value: &str, minimum: &str) -> String {
  let mut sql = format!(
    "CASE WHEN {value} = {minimum} THEN '{}'",
    Bracket::Artifact.as_str()
  );
  for (limit, bracket) in BRACKET_THRESHOLDS {
    sql.push_str(&format!(
      " WHEN {rank} * 100 <= {total} * {limit} THEN '{}'",
      bracket.as_str()
    ));
  }
  sql.push_str(&format!(" ELSE '{}' END", Bracket::Common.as_str()));
  sql
}

/// `CASE` expression mapping a spec id to its class name.
fn class_name_case(spec: &str) -> String {
  let mut sql = format!("CASE {spec}");
  for s in SPECS {
    sql.push_str(&format!(" WHEN {} THEN '{}'", s.spec_id, s.class_name));
  }
  sql.push_str(" END");
  sql
}

/// Window partition of the unfiltered run rankings.
fn run_partition(ranking_type: RankingType) -> String {
  match ranking_type {
    RankingType::Global => "cr.dungeon_id, cr.season_id".to_owned(),
    RankingType::Regional => "cr.dungeon_id, cr.season_id, r.region".to_owned(),
    RankingType::Realm => format!("cr.dungeon_id, cr.season_id, r.region, {POOL}"),
  }
}

fn all_scope(ranking_type: RankingType) -> String {
  match ranking_type {
    RankingType::Global => "'all'".to_owned(),
    RankingType::Regional => "r.region".to_owned(),
    RankingType::Realm => POOL.to_owned(),
  }
}

/// Columns of the `team_best` CTE that split a single (dungeon, season)
/// slice into partitions.
fn slice_partition(ranking_type: RankingType) -> Option<&'static str> {
  match ranking_type {
    RankingType::Global => None,
    RankingType::Regional => Some("region"),
    RankingType::Realm => Some("region, pool"),
  }
}

fn filtered_scope(ranking_type: RankingType) -> String {
  match ranking_type {
    RankingType::Global => "'filtered'".to_owned(),
    RankingType::Regional => format!("region || '{FILTERED_SUFFIX}'"),
    RankingType::Realm => format!("pool || '{FILTERED_SUFFIX}'"),
  }
}

// ─── Rebuild ─────────────────────────────────────────────────────────────────

/// Returns `None` when the run table is empty.
pub(crate) fn rebuild(conn: &mut Connection) -> rusqlite::Result<Option<RebuildStats>> {
  let (runs, computed_at): (i64, i64) = conn.query_row(
    "SELECT COUNT(*), COALESCE(MAX(completed_timestamp), 0) FROM challenge_runs",
    [],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;
  if runs == 0 {
    return Ok(None);
  }

  let tx = conn.transaction()?;
  let run_rankings = rank_runs(&tx, computed_at)?;
  let best_runs = select_best_runs(&tx)?;
  let profiles = summarize_profiles(&tx, computed_at)?;
  let ranked_players = rank_players(&tx)?;
  tx.commit()?;

  Ok(Some(RebuildStats {
    run_rankings,
    best_runs,
    profiles,
    ranked_players,
    computed_at,
  }))
}

fn rank_runs(tx: &Transaction<'_>, computed_at: i64) -> rusqlite::Result<usize> {
  tx.execute("DELETE FROM run_rankings", [])?;

  let slices: Vec<(i64, i64)> = {
    let mut stmt = tx.prepare(
      "SELECT DISTINCT dungeon_id, season_id FROM challenge_runs
       WHERE season_id IS NOT NULL
       ORDER BY dungeon_id, season_id",
    )?;
    let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
    rows.collect::<rusqlite::Result<_>>()?
  };

  let mut total = 0;
  for ranking_type in RankingType::ALL {
    let kind = ranking_type.as_str();

    total += tx.execute(
      &format!(
        "INSERT INTO run_rankings
           (run_id, dungeon_id, ranking_type, ranking_scope, ranking, season_id, computed_at)
         SELECT cr.id, cr.dungeon_id, '{kind}', {scope},
                ROW_NUMBER() OVER (
                  PARTITION BY {partition}
                  ORDER BY cr.duration, cr.completed_timestamp, cr.id
                ),
                cr.season_id, ?1
         FROM challenge_runs cr
         JOIN realms r ON r.id = cr.realm_id
         WHERE cr.season_id IS NOT NULL",
        scope = all_scope(ranking_type),
        partition = run_partition(ranking_type),
      ),
      [computed_at],
    )?;

    let (team_window, rank_window) = match slice_partition(ranking_type) {
      Some(cols) => (
        format!("{cols}, cr_team"),
        format!("PARTITION BY {cols} "),
      ),
      None => ("cr_team".to_owned(), String::new()),
    };
    let filtered_sql = format!(
      "WITH slice AS (
         SELECT cr.id, cr.dungeon_id, cr.season_id, cr.duration, cr.completed_timestamp,
                cr.team_signature AS cr_team, r.region AS region, {POOL} AS pool
         FROM challenge_runs cr
         JOIN realms r ON r.id = cr.realm_id
         WHERE cr.dungeon_id = ?2 AND cr.season_id = ?3
       ),
       team_best AS (
         SELECT *, ROW_NUMBER() OVER (
                     PARTITION BY {team_window}
                     ORDER BY duration, completed_timestamp, id
                   ) AS team_rank
         FROM slice
       )
       INSERT INTO run_rankings
         (run_id, dungeon_id, ranking_type, ranking_scope, ranking, season_id, computed_at)
       SELECT id, dungeon_id, '{kind}', {scope},
              ROW_NUMBER() OVER ({rank_window}ORDER BY duration, completed_timestamp, id),
              season_id, ?1
       FROM team_best
       WHERE team_rank = 1",
      scope = filtered_scope(ranking_type),
    );
    let mut stmt = tx.prepare(&filtered_sql)?;
    for (dungeon_id, season_id) in &slices {
      total += stmt.execute(params![computed_at, dungeon_id, season_id])?;
    }
  }

  // Realm scope keys are only unique within a region.
  let bracket = bracket_case("rnk", "total", "duration", "min_duration");
  tx.execute(
    &format!(
      "UPDATE run_rankings SET percentile_bracket = x.bracket
       FROM (
         SELECT run_id, ranking_type, ranking_scope, season_id, {bracket} AS bracket
         FROM (
           SELECT rr.run_id, rr.ranking_type, rr.ranking_scope, rr.season_id,
                  rr.ranking AS rnk, cr.duration,
                  COUNT(*) OVER w AS total,
                  MIN(cr.duration) OVER w AS min_duration
           FROM run_rankings rr
           JOIN challenge_runs cr ON cr.id = rr.run_id
           JOIN realms r ON r.id = cr.realm_id
           WINDOW w AS (
             PARTITION BY rr.dungeon_id, rr.season_id, rr.ranking_type, rr.ranking_scope,
                          CASE WHEN rr.ranking_type = 'realm' THEN r.region END
           )
         )
       ) AS x
       WHERE run_rankings.run_id = x.run_id
         AND run_rankings.ranking_type = x.ranking_type
         AND run_rankings.ranking_scope = x.ranking_scope
         AND run_rankings.season_id = x.season_id"
    ),
    [],
  )?;

  Ok(total)
}

fn select_best_runs(tx: &Transaction<'_>) -> rusqlite::Result<usize> {
  tx.execute("DELETE FROM player_best_runs", [])?;
  tx.execute(
    &format!(
      "INSERT INTO player_best_runs
         (player_id, dungeon_id, season_id, run_id, duration, completed_timestamp,
          global_ranking_filtered, regional_ranking_filtered, realm_ranking_filtered,
          global_percentile_bracket, regional_percentile_bracket, realm_percentile_bracket)
       SELECT b.player_id, b.dungeon_id, b.season_id, b.run_id, b.duration, b.completed_timestamp,
              g.ranking, rg.ranking, rl.ranking,
              g.percentile_bracket, rg.percentile_bracket, rl.percentile_bracket
       FROM (
         SELECT rm.player_id, cr.dungeon_id, cr.season_id, cr.id AS run_id, cr.duration,
                cr.completed_timestamp, r.region, {POOL} AS pool,
                ROW_NUMBER() OVER (
                  PARTITION BY rm.player_id, cr.dungeon_id, cr.season_id
                  ORDER BY cr.duration, cr.completed_timestamp, cr.id
                ) AS rn
         FROM run_members rm
         JOIN players p ON p.id = rm.player_id AND p.is_valid = 1
         JOIN challenge_runs cr ON cr.id = rm.run_id
         JOIN realms r ON r.id = cr.realm_id
         WHERE cr.season_id IS NOT NULL
       ) b
       LEFT JOIN run_rankings g
         ON g.run_id = b.run_id AND g.season_id = b.season_id
        AND g.ranking_type = 'global' AND g.ranking_scope = 'filtered'
       LEFT JOIN run_rankings rg
         ON rg.run_id = b.run_id AND rg.season_id = b.season_id
        AND rg.ranking_type = 'regional' AND rg.ranking_scope = b.region || '{FILTERED_SUFFIX}'
       LEFT JOIN run_rankings rl
         ON rl.run_id = b.run_id AND rl.season_id = b.season_id
        AND rl.ranking_type = 'realm' AND rl.ranking_scope = b.pool || '{FILTERED_SUFFIX}'
       WHERE b.rn = 1"
    ),
    [],
  )
}

fn summarize_profiles(tx: &Transaction<'_>, computed_at: i64) -> rusqlite::Result<usize> {
  tx.execute("DELETE FROM player_profiles", [])?;

  let dungeon_count: i64 =
    tx.query_row("SELECT COUNT(*) FROM dungeons", [], |r| r.get(0))?;

  let inserted = tx.execute(
    "INSERT INTO player_profiles
       (player_id, season_id, name, realm_id, dungeons_completed, total_runs,
        combined_best_time, average_best_time, has_complete_coverage, last_updated)
     SELECT b.player_id, b.season_id, p.name, p.realm_id,
            COUNT(*),
            (SELECT COUNT(*)
               FROM run_members rm
               JOIN challenge_runs cr ON cr.id = rm.run_id
              WHERE rm.player_id = b.player_id AND cr.season_id = b.season_id),
            SUM(b.duration),
            SUM(b.duration) / COUNT(*),
            CASE WHEN ?2 > 0 AND COUNT(*) = ?2 THEN 1 ELSE 0 END,
            ?1
     FROM player_best_runs b
     JOIN players p ON p.id = b.player_id
     GROUP BY b.player_id, b.season_id",
    params![computed_at, dungeon_count],
  )?;

  tx.execute(
    "UPDATE player_profiles SET main_spec_id = (
       SELECT rm.spec_id
       FROM player_best_runs b
       JOIN run_members rm ON rm.run_id = b.run_id AND rm.player_id = b.player_id
       WHERE b.player_id = player_profiles.player_id
         AND b.season_id = player_profiles.season_id
         AND rm.spec_id IS NOT NULL
       GROUP BY rm.spec_id
       ORDER BY COUNT(*) DESC, rm.spec_id ASC
       LIMIT 1
     )",
    [],
  )?;
  tx.execute(
    &format!(
      "UPDATE player_profiles SET class_name = {}",
      class_name_case("main_spec_id")
    ),
    [],
  )?;

  Ok(inserted)
}

/// One player ranking family: target columns, partition and filter.
struct PlayerRanking {
  rank_column:    &'static str,
  bracket_column: &'static str,
  by_class:       bool,
  ranking_type:   RankingType,
}

const PLAYER_RANKINGS: [PlayerRanking; 6] = [
  PlayerRanking {
    rank_column:    "global_ranking",
    bracket_column: "global_ranking_bracket",
    by_class:       false,
    ranking_type:   RankingType::Global,
  },
  PlayerRanking {
    rank_column:    "regional_ranking",
    bracket_column: "regional_ranking_bracket",
    by_class:       false,
    ranking_type:   RankingType::Regional,
  },
  PlayerRanking {
    rank_column:    "realm_ranking",
    bracket_column: "realm_ranking_bracket",
    by_class:       false,
    ranking_type:   RankingType::Realm,
  },
  PlayerRanking {
    rank_column:    "global_class_rank",
    bracket_column: "global_class_bracket",
    by_class:       true,
    ranking_type:   RankingType::Global,
  },
  PlayerRanking {
    rank_column:    "region_class_rank",
    bracket_column: "region_class_bracket",
    by_class:       true,
    ranking_type:   RankingType::Regional,
  },
  PlayerRanking {
    rank_column:    "realm_class_rank",
    bracket_column: "realm_class_bracket",
    by_class:       true,
    ranking_type:   RankingType::Realm,
  },
];

impl PlayerRanking {
  fn partition(&self) -> String {
    let mut cols = match self.ranking_type {
      RankingType::Global => "pp.season_id".to_owned(),
      RankingType::Regional => "pp.season_id, r.region".to_owned(),
      RankingType::Realm => format!("pp.season_id, r.region, {POOL}"),
    };
    if self.by_class {
      cols.push_str(", pp.class_name");
    }
    cols
  }

  fn sql(&self) -> String {
    let bracket = bracket_case("rnk", "total", "combined_best_time", "min_time");
    let class_filter = if self.by_class { "AND pp.class_name IS NOT NULL" } else { "" };
    format!(
      "UPDATE player_profiles SET {rank} = x.rnk, {bracket_col} = x.bracket
       FROM (
         SELECT player_id, season_id, rnk, {bracket} AS bracket
         FROM (
           SELECT pp.player_id, pp.season_id, pp.combined_best_time,
                  ROW_NUMBER() OVER (
                    PARTITION BY {partition}
                    ORDER BY pp.combined_best_time, pp.name, pp.player_id
                  ) AS rnk,
                  COUNT(*) OVER (PARTITION BY {partition}) AS total,
                  MIN(pp.combined_best_time) OVER (PARTITION BY {partition}) AS min_time
           FROM player_profiles pp
           JOIN realms r ON r.id = pp.realm_id
           WHERE pp.has_complete_coverage = 1
             AND pp.combined_best_time IS NOT NULL
             {class_filter}
         )
       ) AS x
       WHERE player_profiles.player_id = x.player_id
         AND player_profiles.season_id = x.season_id",
      rank = self.rank_column,
      bracket_col = self.bracket_column,
      partition = self.partition(),
    )
  }
}

fn rank_players(tx: &Transaction<'_>) -> rusqlite::Result<usize> {
  let mut ranked = 0;
  for family in &PLAYER_RANKINGS {
    let updated = tx.execute(&family.sql(), [])?;
    if family.rank_column == "global_ranking" {
      ranked = updated;
    }
  }
  Ok(ranked)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bracket_case_orders_thresholds() {
    let sql = bracket_case("rnk", "total", "d", "m");
    assert!(sql.starts_with("CASE WHEN d = m THEN 'artifact'"));
    let excellent = sql.find("'excellent'").unwrap();
    let uncommon = sql.find("'uncommon'").unwrap();
    assert!(excellent < uncommon);
    assert!(sql.ends_with("ELSE 'common' END"));
  }

  #[test]
  fn class_case_covers_every_spec() {
    let sql = class_name_case("s");
    assert!(sql.contains("WHEN 250 THEN 'Death Knight'"));
    assert_eq!(sql.matches(" WHEN ").count(), SPECS.len());
  }
}
