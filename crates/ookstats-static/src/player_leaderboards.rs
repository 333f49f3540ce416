//! Player leaderboards: complete-coverage players ranked by combined best
//! time, globally, per region, per realm pool and per class.

use std::{
  collections::{BTreeMap, BTreeSet},
  path::{Path, PathBuf},
};

use ookstats_core::{
  slug::{class_key, effective_realm_slug},
  wow::spec_info,
};
use ookstats_store_sqlite::loader::RankedPlayer;

use crate::{
  Emitter, Result,
  pages::{Page, PlayerEntry, PlayerLeaderboardPage},
  pagination::{Pagination, pages},
};

/// A player placed in one leaderboard.
struct Placed<'p> {
  player:  &'p RankedPlayer,
  rank:    Option<i64>,
  bracket: Option<&'p String>,
}

#[derive(Clone, Copy)]
enum Scope<'a> {
  Global,
  Regional(&'a str),
  Realm(&'a str, &'a str),
}

impl Scope<'_> {
  fn title(self) -> String {
    match self {
      Self::Global => "Global Player Rankings".to_owned(),
      Self::Regional(region) => format!("{} Player Rankings", region.to_uppercase()),
      Self::Realm(region, realm) => format!("{}/{realm} Player Rankings", region.to_uppercase()),
    }
  }

  fn dir(self, base: &Path) -> PathBuf {
    match self {
      Self::Global => base.join("global"),
      Self::Regional(region) => base.join("regional").join(region),
      Self::Realm(region, realm) => base.join("realm").join(region).join(realm),
    }
  }

  fn place<'p>(self, player: &'p RankedPlayer, by_class: bool) -> Placed<'p> {
    let (rank, bracket) = match (self, by_class) {
      (Self::Global, false) => (player.global_ranking, &player.global_ranking_bracket),
      (Self::Regional(_), false) => (player.regional_ranking, &player.regional_ranking_bracket),
      (Self::Realm(..), false) => (player.realm_ranking, &player.realm_ranking_bracket),
      (Self::Global, true) => (player.global_class_rank, &player.global_class_bracket),
      (Self::Regional(_), true) => (player.region_class_rank, &player.region_class_bracket),
      (Self::Realm(..), true) => (player.realm_class_rank, &player.realm_class_bracket),
    };
    Placed { player, rank, bracket: bracket.as_ref() }
  }
}

/// Class name, falling back to the class of the main spec.
fn class_of(player: &RankedPlayer) -> Option<String> {
  player
    .class_name
    .clone()
    .filter(|c| !c.is_empty())
    .or_else(|| player.main_spec_id.and_then(spec_info).map(|s| s.class_name.to_owned()))
}

fn entry(placed: &Placed<'_>) -> PlayerEntry {
  let p = placed.player;
  let spec = p.main_spec_id.and_then(spec_info);
  PlayerEntry {
    player_id:          p.player_id,
    name:               p.name.clone(),
    realm_slug:         p.realm_slug.clone(),
    realm_name:         p.realm_name.clone(),
    region:             p.region.clone(),
    class_name:         class_of(p).unwrap_or_default(),
    active_spec_name:   p
      .active_spec_name
      .clone()
      .filter(|s| !s.is_empty())
      .or_else(|| spec.map(|s| s.spec_name.to_owned()))
      .unwrap_or_default(),
    main_spec_id:       p.main_spec_id,
    combined_best_time: p.combined_best_time,
    dungeons_completed: p.dungeons_completed,
    total_runs:         p.total_runs,
    ranking_percentile: placed.bracket.cloned(),
  }
}

/// Queue every player leaderboard page of `season_id`.
pub(crate) async fn emit_season(ctx: &Emitter<'_>, season_id: i64) -> Result<usize> {
  let players = ctx.store.ranked_players(season_id).await?;
  if players.is_empty() {
    return Ok(0);
  }
  let base = ctx.api.join("season").join(season_id.to_string()).join("players");

  let mut realms: BTreeSet<(String, String)> = BTreeSet::new();
  for p in &players {
    if ctx.wants_region(&p.region) {
      realms.insert((p.region.clone(), effective_realm_slug(&p.region, &p.pool)));
    }
  }

  let mut queued = 0;
  let everyone: Vec<&RankedPlayer> = players.iter().collect();
  queued += emit_scopes(ctx, &base, &everyone, &realms, false).await?;

  let mut by_class: BTreeMap<String, Vec<&RankedPlayer>> = BTreeMap::new();
  for p in &players {
    if let Some(class) = class_of(p) {
      by_class.entry(class_key(&class)).or_default().push(p);
    }
  }
  for (class, members) in &by_class {
    queued += emit_scopes(ctx, &base.join("class").join(class), members, &realms, true).await?;
  }

  tracing::info!(
    season = season_id,
    players = players.len(),
    pages = queued,
    "player leaderboards queued"
  );
  Ok(queued)
}

async fn emit_scopes(
  ctx: &Emitter<'_>,
  base: &Path,
  players: &[&RankedPlayer],
  realms: &BTreeSet<(String, String)>,
  by_class: bool,
) -> Result<usize> {
  let mut queued = emit_board(ctx, base, Scope::Global, players.iter().copied(), by_class).await?;

  for region in &ctx.regions {
    let members = players.iter().copied().filter(|p| p.region == *region);
    queued += emit_board(ctx, base, Scope::Regional(region), members, by_class).await?;
  }

  for (region, leader) in realms {
    let members = players
      .iter()
      .copied()
      .filter(|p| p.region == *region && effective_realm_slug(&p.region, &p.pool) == *leader);
    queued += emit_board(ctx, base, Scope::Realm(region, leader), members, by_class).await?;
  }
  Ok(queued)
}

async fn emit_board<'p>(
  ctx: &Emitter<'_>,
  base: &Path,
  scope: Scope<'_>,
  players: impl Iterator<Item = &'p RankedPlayer>,
  by_class: bool,
) -> Result<usize> {
  let mut placed: Vec<Placed<'p>> = players.map(|p| scope.place(p, by_class)).collect();
  if placed.is_empty() {
    return Ok(0);
  }
  placed.sort_by(|a, b| {
    (a.rank.is_none(), a.rank, &a.player.name, a.player.player_id)
      .cmp(&(b.rank.is_none(), b.rank, &b.player.name, b.player.player_id))
  });

  let dir = scope.dir(base);
  let title = scope.title();
  let total = placed.len();
  let mut queued = 0;
  for (page, chunk) in pages(&placed, ctx.page_size) {
    let body = PlayerLeaderboardPage {
      leaderboard:         chunk.iter().map(entry).collect(),
      title:               title.clone(),
      generated_timestamp: ctx.generated_at,
      pagination:          Pagination::players(page, ctx.page_size, total),
    };
    ctx.queue.send(dir.join(format!("{page}.json")), Page::Players(body)).await?;
    queued += 1;
  }
  Ok(queued)
}
