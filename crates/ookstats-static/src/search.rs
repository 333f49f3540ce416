//! The sharded player search index.

use chrono::{DateTime, SecondsFormat};

use crate::{
  Emitter, Result,
  pages::{Page, SearchEntry, SearchMetadata, SearchShard},
  pagination::pages,
};

pub const DEFAULT_SHARD_SIZE: usize = 5000;

/// Queue `api/search/players-NNN.json` shards of the latest season's ranked
/// players, in global ranking order.
pub(crate) async fn emit_shards(ctx: &Emitter<'_>) -> Result<usize> {
  let Some(season_id) = ctx.store.latest_season().await? else {
    tracing::warn!("no player profiles; skipping search index");
    return Ok(0);
  };
  let players = ctx.store.ranked_players(season_id).await?;
  let last_updated = rfc3339(ctx.generated_at);
  let shard_size = ctx.options.shard_size.max(1);
  let dir = ctx.api.join("search");

  let mut queued = 0;
  for (n, chunk) in pages(&players, shard_size) {
    let shard = n - 1;
    let body = SearchShard {
      players:  chunk
        .iter()
        .map(|p| SearchEntry {
          id:                     p.player_id,
          name:                   p.name.clone(),
          region:                 p.region.clone(),
          realm_slug:             p.realm_slug.clone(),
          realm_name:             p.realm_name.clone(),
          class_name:             p.class_name.clone(),
          global_ranking:         p.global_ranking,
          global_ranking_bracket: p.global_ranking_bracket.clone(),
        })
        .collect(),
      metadata: SearchMetadata {
        total_players:    players.len(),
        returned_players: chunk.len(),
        offset:           shard * shard_size,
        limit:            shard_size,
        last_updated:     last_updated.clone(),
      },
    };
    ctx.queue.send(dir.join(format!("players-{shard:03}.json")), Page::Search(body)).await?;
    queued += 1;
  }

  tracing::info!(
    season = season_id,
    players = players.len(),
    shards = queued,
    "search index queued"
  );
  Ok(queued)
}

fn rfc3339(millis: i64) -> String {
  DateTime::from_timestamp_millis(millis)
    .unwrap_or_default()
    .to_rfc3339_opts(SecondsFormat::Secs, true)
}
