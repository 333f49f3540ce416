//! Per-player pages.

use std::{
  collections::BTreeMap,
  path::{Path, PathBuf},
};

use ookstats_core::slug::name_to_slug;
use ookstats_store_sqlite::loader::{BestRunRow, IN_BATCH, PlayerBundle, SeasonProfileRow};

use crate::{
  Emitter, Result,
  pages::{BestRunDoc, EquipmentDoc, EnchantmentDoc, Member, Page, PlayerDoc, PlayerPage, SeasonDoc},
};

/// `api/player/{region}/{realm_slug}/{name_slug}.json`.
pub fn player_path(api: &Path, region: &str, realm_slug: &str, name: &str) -> PathBuf {
  api
    .join("player")
    .join(region.to_lowercase())
    .join(realm_slug)
    .join(format!("{}.json", name_to_slug(name)))
}

/// Queue a page for every player with complete coverage in some season.
pub(crate) async fn emit_all(ctx: &Emitter<'_>) -> Result<usize> {
  let ids = ctx.store.page_player_ids().await?;
  tracing::info!(players = ids.len(), "building player pages");

  let mut queued = 0;
  for chunk in ids.chunks(IN_BATCH) {
    let bundles = ctx.store.player_bundles(chunk.to_vec()).await?;
    for id in chunk {
      let Some(bundle) = bundles.get(id) else {
        continue;
      };
      let p = &bundle.player;
      let path = player_path(&ctx.api, &p.region, &p.realm_slug, &p.name);
      let page = player_page(bundle, ctx.generated_at);
      ctx.queue.send(path, Page::Player(Box::new(page))).await?;
      queued += 1;
    }
    tracing::debug!(queued, "player page batch queued");
  }
  Ok(queued)
}

pub fn player_page(bundle: &PlayerBundle, generated_at: i64) -> PlayerPage {
  let p = &bundle.player;

  let mut seasons: BTreeMap<String, SeasonDoc> =
    bundle.seasons.iter().map(|s| (s.season_id.to_string(), season_doc(s))).collect();
  for run in &bundle.best_runs {
    if let Some(season) = seasons.get_mut(&run.season_id.to_string()) {
      season.best_runs.insert(run.dungeon_slug.clone(), best_run_doc(run));
    }
  }

  let equipment = bundle
    .equipment
    .iter()
    .map(|e| {
      (e.item.slot_type.clone(), EquipmentDoc {
        id:                 e.id,
        slot_type:          e.item.slot_type.clone(),
        item_id:            e.item.item_id,
        upgrade_id:         e.item.upgrade_id,
        quality:            e.item.quality.clone(),
        item_name:          e.item.item_name.clone(),
        snapshot_timestamp: e.snapshot_timestamp,
        item_icon_slug:     None,
        item_type:          None,
        enchantments:       e.item.enchantments.iter().map(EnchantmentDoc::from).collect(),
      })
    })
    .collect();

  PlayerPage {
    player: PlayerDoc {
      id: p.id,
      name: p.name.clone(),
      realm_slug: p.realm_slug.clone(),
      realm_name: p.realm_name.clone(),
      region: p.region.clone(),
      class_name: p.class_name.clone(),
      active_spec_name: p.active_spec_name.clone(),
      avatar_url: p.avatar_url.clone(),
      guild_name: p.guild_name.clone(),
      race_name: p.race_name.clone(),
      average_item_level: p.average_item_level,
      equipped_item_level: p.equipped_item_level,
      seasons,
    },
    equipment,
    generated_at,
    version: env!("CARGO_PKG_VERSION"),
  }
}

fn season_doc(s: &SeasonProfileRow) -> SeasonDoc {
  SeasonDoc {
    main_spec_id:             s.main_spec_id,
    dungeons_completed:       s.dungeons_completed,
    total_runs:               s.total_runs,
    combined_best_time:       s.combined_best_time,
    global_ranking:           s.global_ranking,
    regional_ranking:         s.regional_ranking,
    realm_ranking:            s.realm_ranking,
    global_ranking_bracket:   s.global_ranking_bracket.clone(),
    regional_ranking_bracket: s.regional_ranking_bracket.clone(),
    realm_ranking_bracket:    s.realm_ranking_bracket.clone(),
    last_updated:             s.last_updated,
    best_runs:                BTreeMap::new(),
  }
}

fn best_run_doc(run: &BestRunRow) -> BestRunDoc {
  BestRunDoc {
    dungeon_id:                  run.dungeon_id,
    dungeon_name:                run.dungeon_name.clone(),
    dungeon_slug:                run.dungeon_slug.clone(),
    run_id:                      run.run_id,
    duration:                    run.duration,
    completed_timestamp:         run.completed_timestamp,
    global_ranking_filtered:     run.global_ranking_filtered,
    regional_ranking_filtered:   run.regional_ranking_filtered,
    realm_ranking_filtered:      run.realm_ranking_filtered,
    global_percentile_bracket:   run.global_percentile_bracket.clone(),
    regional_percentile_bracket: run.regional_percentile_bracket.clone(),
    realm_percentile_bracket:    run.realm_percentile_bracket.clone(),
    team_members:                run.team_members.iter().map(Member::from).collect(),
  }
}
