//! Run leaderboard pages: the filtered rankings of every scope, one
//! directory per dungeon.

use std::{collections::BTreeMap, path::PathBuf};

use ookstats_core::{ranking::RankingScope, slug::effective_realm_slug};
use ookstats_store_sqlite::loader::RankedRun;

use crate::{
  Emitter, Result,
  pages::{ConnectedRealm, LeaderboardPage, LeadingGroup, MapInfo, Member, Page},
  pagination::{Pagination, pages},
};

struct Board<'r> {
  dungeon_id:      i64,
  connected_realm: Option<String>,
  runs:            Vec<&'r RankedRun>,
}

/// Queue every run leaderboard page of `season_id`. Returns the page count.
pub(crate) async fn emit_season(ctx: &Emitter<'_>, season_id: i64) -> Result<usize> {
  let runs = ctx.store.filtered_run_rankings(season_id).await?;
  if runs.is_empty() {
    return Ok(0);
  }

  let mut run_ids: Vec<i64> = runs.iter().map(|r| r.run_id).collect();
  run_ids.sort_unstable();
  run_ids.dedup();
  let members = ctx.store.run_members(run_ids).await?;

  let season_dir = ctx.api.join("season").join(season_id.to_string());
  let mut boards: BTreeMap<PathBuf, Board<'_>> = BTreeMap::new();
  for run in &runs {
    let Some(dungeon) = ctx.dungeons.get(&run.dungeon_id) else {
      tracing::warn!(
        dungeon_id = run.dungeon_id,
        run_id = run.run_id,
        "ranked run of unknown dungeon"
      );
      continue;
    };
    let (dir, connected_realm) = match run.scope()? {
      RankingScope::Global { .. } => (season_dir.join("global"), None),
      RankingScope::Regional { region, .. } => {
        if !ctx.wants_region(&region) {
          continue;
        }
        (season_dir.join(&region).join("all"), None)
      }
      RankingScope::Realm { pool, .. } => {
        if !ctx.wants_region(&run.region) {
          continue;
        }
        let leader = effective_realm_slug(&run.region, &pool);
        let name = ctx.realm_name(&run.region, &leader);
        (season_dir.join(&run.region).join(&leader), Some(name))
      }
    };
    boards
      .entry(dir.join(&dungeon.slug))
      .or_insert_with(|| Board { dungeon_id: dungeon.id, connected_realm, runs: Vec::new() })
      .runs
      .push(run);
  }

  let mut queued = 0;
  for (dir, mut board) in boards {
    board.runs.sort_by_key(|r| r.ranking);
    let dungeon_name =
      ctx.dungeons.get(&board.dungeon_id).map(|d| d.name.as_str()).unwrap_or_default();
    let total = board.runs.len();

    for (page, chunk) in pages(&board.runs, ctx.page_size) {
      let leading_groups = chunk
        .iter()
        .map(|run| LeadingGroup {
          id:                  run.run_id,
          duration:            run.duration,
          completed_timestamp: run.completed_timestamp,
          keystone_level:      run.keystone_level,
          dungeon_name:        dungeon_name.to_owned(),
          realm_name:          run.realm_name.clone(),
          region:              run.region.clone(),
          members:             members
            .get(&run.run_id)
            .map(|m| m.iter().map(Member::from).collect())
            .unwrap_or_default(),
          ranking_percentile:  run.bracket.clone(),
        })
        .collect();

      let body = LeaderboardPage {
        leading_groups,
        map: MapInfo::named(dungeon_name),
        connected_realm: board.connected_realm.clone().map(|name| ConnectedRealm { name }),
        pagination: Pagination::runs(page, ctx.page_size, total),
      };
      ctx.queue.send(dir.join(format!("{page}.json")), Page::Leaderboard(body)).await?;
      queued += 1;
    }
  }

  tracing::info!(season = season_id, pages = queued, "run leaderboards queued");
  Ok(queued)
}
