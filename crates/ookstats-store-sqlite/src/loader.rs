//! Bulk reads over the ranked tables, used by the static emitter.
//!
//! Everything here is read-only. Id-keyed lookups are issued in `IN` batches
//! of [`IN_BATCH`] ids.

use std::collections::HashMap;

use rusqlite::{Connection, params_from_iter};

use ookstats_core::{
  model::{DungeonInfo, EquippedItem, RealmInfo},
  ranking::{RankingScope, RankingType},
};

use crate::{Result, SqliteStore, profiles::enchantments_for};

pub const IN_BATCH: usize = 10_000;

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One filtered-variant run ranking with the run fields pages need.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRun {
  pub ranking_type:        RankingType,
  pub ranking_scope:       String,
  /// Region of the run's realm.
  pub region:              String,
  /// Pool key of the run's realm.
  pub pool:                String,
  pub dungeon_id:          i64,
  pub ranking:             i64,
  pub bracket:             Option<String>,
  pub run_id:              i64,
  pub duration:            i64,
  pub completed_timestamp: i64,
  pub keystone_level:      i64,
  pub realm_name:          String,
}

impl RankedRun {
  pub fn scope(&self) -> Result<RankingScope> {
    Ok(RankingScope::from_columns(self.ranking_type.as_str(), &self.ranking_scope)?)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRow {
  pub player_id:  i64,
  pub name:       String,
  pub spec_id:    Option<i64>,
  pub region:     String,
  pub realm_slug: String,
}

/// A player profile with complete coverage, and its rankings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPlayer {
  pub player_id:                i64,
  pub season_id:                i64,
  pub name:                     String,
  pub realm_slug:               String,
  pub realm_name:               String,
  pub region:                   String,
  pub pool:                     String,
  pub class_name:               Option<String>,
  pub active_spec_name:         Option<String>,
  pub main_spec_id:             Option<i64>,
  pub combined_best_time:       Option<i64>,
  pub dungeons_completed:       i64,
  pub total_runs:               i64,
  pub global_ranking:           Option<i64>,
  pub regional_ranking:         Option<i64>,
  pub realm_ranking:            Option<i64>,
  pub global_ranking_bracket:   Option<String>,
  pub regional_ranking_bracket: Option<String>,
  pub realm_ranking_bracket:    Option<String>,
  pub global_class_rank:        Option<i64>,
  pub region_class_rank:        Option<i64>,
  pub realm_class_rank:         Option<i64>,
  pub global_class_bracket:     Option<String>,
  pub region_class_bracket:     Option<String>,
  pub realm_class_bracket:      Option<String>,
  pub last_updated:             Option<i64>,
}

/// Player identity and enrichment details.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerRow {
  pub id:                  i64,
  pub name:                String,
  pub realm_slug:          String,
  pub realm_name:          String,
  pub region:              String,
  pub class_name:          Option<String>,
  pub active_spec_name:    Option<String>,
  pub avatar_url:          Option<String>,
  pub guild_name:          Option<String>,
  pub race_name:           Option<String>,
  pub average_item_level:  Option<i64>,
  pub equipped_item_level: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonProfileRow {
  pub season_id:                i64,
  pub main_spec_id:             Option<i64>,
  pub dungeons_completed:       i64,
  pub total_runs:               i64,
  pub combined_best_time:       Option<i64>,
  pub global_ranking:           Option<i64>,
  pub regional_ranking:         Option<i64>,
  pub realm_ranking:            Option<i64>,
  pub global_ranking_bracket:   Option<String>,
  pub regional_ranking_bracket: Option<String>,
  pub realm_ranking_bracket:    Option<String>,
  pub last_updated:             Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestRunRow {
  pub season_id:                   i64,
  pub dungeon_id:                  i64,
  pub dungeon_name:                String,
  pub dungeon_slug:                String,
  pub run_id:                      i64,
  pub duration:                    i64,
  pub completed_timestamp:         i64,
  pub global_ranking_filtered:     Option<i64>,
  pub regional_ranking_filtered:   Option<i64>,
  pub realm_ranking_filtered:      Option<i64>,
  pub global_percentile_bracket:   Option<String>,
  pub regional_percentile_bracket: Option<String>,
  pub realm_percentile_bracket:    Option<String>,
  pub team_members:                Vec<MemberRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentRow {
  pub id:                 i64,
  pub snapshot_timestamp: i64,
  pub item:               EquippedItem,
}

/// Everything a player page is built from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerBundle {
  pub player:    PlayerRow,
  pub seasons:   Vec<SeasonProfileRow>,
  pub best_runs: Vec<BestRunRow>,
  pub equipment: Vec<EquipmentRow>,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

fn placeholders(n: usize) -> String {
  vec!["?"; n].join(", ")
}

impl SqliteStore {
  pub async fn load_realms(&self) -> Result<Vec<RealmInfo>> {
    self
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, name, region, slug, NULLIF(parent_realm_slug, '')
           FROM realms ORDER BY region, slug",
        )?;
        let rows = stmt.query_map([], |r| {
          Ok(RealmInfo {
            id:                r.get(0)?,
            name:              r.get::<_, Option<String>>(1)?.unwrap_or_default(),
            region:            r.get::<_, Option<String>>(2)?.unwrap_or_default(),
            slug:              r.get::<_, Option<String>>(3)?.unwrap_or_default(),
            parent_realm_slug: r.get(4)?,
          })
        })?;
        rows.collect()
      })
      .await
  }

  pub async fn load_dungeons(&self) -> Result<Vec<DungeonInfo>> {
    self
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name, slug FROM dungeons ORDER BY id")?;
        let rows = stmt.query_map([], |r| {
          Ok(DungeonInfo {
            id:   r.get(0)?,
            name: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
            slug: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
          })
        })?;
        rows.collect()
      })
      .await
  }

  /// Season numbers that have run rankings, ascending.
  pub async fn ranked_seasons(&self) -> Result<Vec<i64>> {
    self
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT season_id FROM run_rankings ORDER BY season_id",
        )?;
        let rows = stmt.query_map([], |r| r.get::<_, i64>(0))?;
        rows.collect()
      })
      .await
  }

  /// The newest season with player profiles.
  pub async fn latest_season(&self) -> Result<Option<i64>> {
    self
      .call(|conn| {
        conn.query_row("SELECT MAX(season_id) FROM player_profiles", [], |r| r.get(0))
      })
      .await
  }

  /// Newest `last_updated` stamp across player profiles.
  pub async fn profiles_updated_at(&self) -> Result<i64> {
    self
      .call(|conn| {
        conn.query_row(
          "SELECT COALESCE(MAX(last_updated), 0) FROM player_profiles",
          [],
          |r| r.get(0),
        )
      })
      .await
  }

  /// Filtered-variant run rankings of `season_id` in page order:
  /// type, region, scope, dungeon, rank.
  pub async fn filtered_run_rankings(&self, season_id: i64) -> Result<Vec<RankedRun>> {
    let raw: Vec<(String, RankedRun)> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT rr.ranking_type, rr.ranking_scope, r.region,
                  COALESCE(NULLIF(r.parent_realm_slug, ''), r.slug),
                  rr.dungeon_id, rr.ranking, rr.percentile_bracket,
                  cr.id, cr.duration, cr.completed_timestamp, cr.keystone_level,
                  COALESCE(r.name, r.slug)
           FROM run_rankings rr
           JOIN challenge_runs cr ON cr.id = rr.run_id
           JOIN realms r ON r.id = cr.realm_id
           WHERE rr.season_id = ?1
             AND (rr.ranking_scope = 'filtered' OR rr.ranking_scope LIKE '%\\_filtered' ESCAPE '\\')
           ORDER BY rr.ranking_type, r.region, rr.ranking_scope, rr.dungeon_id, rr.ranking",
        )?;
        let rows = stmt.query_map([season_id], |r| {
          Ok((r.get::<_, String>(0)?, RankedRun {
            ranking_type:        RankingType::Global,
            ranking_scope:       r.get(1)?,
            region:              r.get(2)?,
            pool:                r.get(3)?,
            dungeon_id:          r.get(4)?,
            ranking:             r.get(5)?,
            bracket:             r.get(6)?,
            run_id:              r.get(7)?,
            duration:            r.get(8)?,
            completed_timestamp: r.get(9)?,
            keystone_level:      r.get::<_, Option<i64>>(10)?.unwrap_or(1),
            realm_name:          r.get(11)?,
          }))
        })?;
        rows.collect()
      })
      .await?;

    raw
      .into_iter()
      .map(|(kind, mut run)| -> Result<RankedRun> {
        run.ranking_type = RankingType::parse(&kind)?;
        Ok(run)
      })
      .collect()
  }

  /// Members of each run, ordered by name.
  pub async fn run_members(&self, run_ids: Vec<i64>) -> Result<HashMap<i64, Vec<MemberRow>>> {
    self.call(move |conn| members_by_run(conn, &run_ids)).await
  }

  /// Complete-coverage profiles of `season_id` with their player fields.
  pub async fn ranked_players(&self, season_id: i64) -> Result<Vec<RankedPlayer>> {
    self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT pp.player_id, pp.season_id, p.name, r.slug, COALESCE(r.name, r.slug), r.region,
                  COALESCE(NULLIF(r.parent_realm_slug, ''), r.slug),
                  pp.class_name, pd.active_spec_name, pp.main_spec_id, pp.combined_best_time,
                  pp.dungeons_completed, pp.total_runs,
                  pp.global_ranking, pp.regional_ranking, pp.realm_ranking,
                  pp.global_ranking_bracket, pp.regional_ranking_bracket, pp.realm_ranking_bracket,
                  pp.global_class_rank, pp.region_class_rank, pp.realm_class_rank,
                  pp.global_class_bracket, pp.region_class_bracket, pp.realm_class_bracket,
                  pp.last_updated
           FROM player_profiles pp
           JOIN players p ON p.id = pp.player_id
           JOIN realms r ON r.id = p.realm_id
           LEFT JOIN player_details pd ON pd.player_id = pp.player_id
           WHERE pp.season_id = ?1 AND pp.has_complete_coverage = 1 AND p.is_valid = 1
           ORDER BY pp.global_ranking IS NULL, pp.global_ranking, p.name, pp.player_id",
        )?;
        let rows = stmt.query_map([season_id], |r| {
          Ok(RankedPlayer {
            player_id:                r.get(0)?,
            season_id:                r.get(1)?,
            name:                     r.get(2)?,
            realm_slug:               r.get(3)?,
            realm_name:               r.get(4)?,
            region:                   r.get(5)?,
            pool:                     r.get(6)?,
            class_name:               r.get(7)?,
            active_spec_name:         r.get(8)?,
            main_spec_id:             r.get(9)?,
            combined_best_time:       r.get(10)?,
            dungeons_completed:       r.get(11)?,
            total_runs:               r.get(12)?,
            global_ranking:           r.get(13)?,
            regional_ranking:         r.get(14)?,
            realm_ranking:            r.get(15)?,
            global_ranking_bracket:   r.get(16)?,
            regional_ranking_bracket: r.get(17)?,
            realm_ranking_bracket:    r.get(18)?,
            global_class_rank:        r.get(19)?,
            region_class_rank:        r.get(20)?,
            realm_class_rank:         r.get(21)?,
            global_class_bracket:     r.get(22)?,
            region_class_bracket:     r.get(23)?,
            realm_class_bracket:      r.get(24)?,
            last_updated:             r.get(25)?,
          })
        })?;
        rows.collect()
      })
      .await
  }

  /// Valid players with complete coverage in any season, by id.
  pub async fn page_player_ids(&self) -> Result<Vec<i64>> {
    self
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT pp.player_id
           FROM player_profiles pp
           JOIN players p ON p.id = pp.player_id
           WHERE pp.has_complete_coverage = 1 AND p.is_valid = 1
           ORDER BY pp.player_id",
        )?;
        let rows = stmt.query_map([], |r| r.get::<_, i64>(0))?;
        rows.collect()
      })
      .await
  }

  /// Load page data for `ids`.
  pub async fn player_bundles(&self, ids: Vec<i64>) -> Result<HashMap<i64, PlayerBundle>> {
    self.call(move |conn| load_bundles(conn, &ids)).await
  }
}

// ─── Batched loaders ─────────────────────────────────────────────────────────

fn members_by_run(
  conn: &Connection,
  run_ids: &[i64],
) -> rusqlite::Result<HashMap<i64, Vec<MemberRow>>> {
  let mut out: HashMap<i64, Vec<MemberRow>> = HashMap::new();
  for chunk in run_ids.chunks(IN_BATCH) {
    let mut stmt = conn.prepare(&format!(
      "SELECT rm.run_id, p.id, p.name, rm.spec_id, r.region, r.slug
       FROM run_members rm
       JOIN players p ON p.id = rm.player_id
       JOIN realms r ON r.id = p.realm_id
       WHERE rm.run_id IN ({})
       ORDER BY rm.run_id, p.name, p.id",
      placeholders(chunk.len())
    ))?;
    let mut rows = stmt.query(params_from_iter(chunk))?;
    while let Some(r) = rows.next()? {
      out.entry(r.get(0)?).or_default().push(MemberRow {
        player_id:  r.get(1)?,
        name:       r.get(2)?,
        spec_id:    r.get(3)?,
        region:     r.get(4)?,
        realm_slug: r.get(5)?,
      });
    }
  }
  Ok(out)
}

fn load_bundles(conn: &Connection, ids: &[i64]) -> rusqlite::Result<HashMap<i64, PlayerBundle>> {
  let mut bundles: HashMap<i64, PlayerBundle> = HashMap::new();
  let mut best_run_ids = Vec::new();

  for chunk in ids.chunks(IN_BATCH) {
    let list = placeholders(chunk.len());

    let mut stmt = conn.prepare(&format!(
      "SELECT p.id, p.name, r.slug, COALESCE(r.name, r.slug), r.region,
              pd.class_name, pd.active_spec_name, pd.avatar_url, pd.guild_name,
              pd.race_name, pd.average_item_level, pd.equipped_item_level
       FROM players p
       JOIN realms r ON r.id = p.realm_id
       LEFT JOIN player_details pd ON pd.player_id = p.id
       WHERE p.id IN ({list})"
    ))?;
    let mut rows = stmt.query(params_from_iter(chunk))?;
    while let Some(r) = rows.next()? {
      let player = PlayerRow {
        id:                  r.get(0)?,
        name:                r.get(1)?,
        realm_slug:          r.get(2)?,
        realm_name:          r.get(3)?,
        region:              r.get(4)?,
        class_name:          r.get(5)?,
        active_spec_name:    r.get(6)?,
        avatar_url:          r.get(7)?,
        guild_name:          r.get(8)?,
        race_name:           r.get(9)?,
        average_item_level:  r.get(10)?,
        equipped_item_level: r.get(11)?,
      };
      bundles.insert(player.id, PlayerBundle { player, ..Default::default() });
    }

    let mut stmt = conn.prepare(&format!(
      "SELECT player_id, season_id, main_spec_id, dungeons_completed, total_runs,
              combined_best_time, global_ranking, regional_ranking, realm_ranking,
              global_ranking_bracket, regional_ranking_bracket, realm_ranking_bracket,
              last_updated
       FROM player_profiles
       WHERE player_id IN ({list})
       ORDER BY player_id, season_id"
    ))?;
    let mut rows = stmt.query(params_from_iter(chunk))?;
    while let Some(r) = rows.next()? {
      let Some(bundle) = bundles.get_mut(&r.get::<_, i64>(0)?) else { continue };
      bundle.seasons.push(SeasonProfileRow {
        season_id:                r.get(1)?,
        main_spec_id:             r.get(2)?,
        dungeons_completed:       r.get(3)?,
        total_runs:               r.get(4)?,
        combined_best_time:       r.get(5)?,
        global_ranking:           r.get(6)?,
        regional_ranking:         r.get(7)?,
        realm_ranking:            r.get(8)?,
        global_ranking_bracket:   r.get(9)?,
        regional_ranking_bracket: r.get(10)?,
        realm_ranking_bracket:    r.get(11)?,
        last_updated:             r.get(12)?,
      });
    }

    let mut stmt = conn.prepare(&format!(
      "SELECT b.player_id, b.season_id, b.dungeon_id, COALESCE(d.name, ''), COALESCE(d.slug, ''),
              b.run_id, b.duration, b.completed_timestamp,
              b.global_ranking_filtered, b.regional_ranking_filtered, b.realm_ranking_filtered,
              b.global_percentile_bracket, b.regional_percentile_bracket, b.realm_percentile_bracket
       FROM player_best_runs b
       LEFT JOIN dungeons d ON d.id = b.dungeon_id
       WHERE b.player_id IN ({list})
       ORDER BY b.player_id, b.season_id, b.dungeon_id"
    ))?;
    let mut rows = stmt.query(params_from_iter(chunk))?;
    while let Some(r) = rows.next()? {
      let Some(bundle) = bundles.get_mut(&r.get::<_, i64>(0)?) else { continue };
      let run = BestRunRow {
        season_id:                   r.get(1)?,
        dungeon_id:                  r.get(2)?,
        dungeon_name:                r.get(3)?,
        dungeon_slug:                r.get(4)?,
        run_id:                      r.get(5)?,
        duration:                    r.get(6)?,
        completed_timestamp:         r.get(7)?,
        global_ranking_filtered:     r.get(8)?,
        regional_ranking_filtered:   r.get(9)?,
        realm_ranking_filtered:      r.get(10)?,
        global_percentile_bracket:   r.get(11)?,
        regional_percentile_bracket: r.get(12)?,
        realm_percentile_bracket:    r.get(13)?,
        team_members:                Vec::new(),
      };
      best_run_ids.push(run.run_id);
      bundle.best_runs.push(run);
    }

    // Latest snapshot per slot.
    let mut stmt = conn.prepare(&format!(
      "SELECT e.player_id, e.id, e.slot_type, e.item_id, e.upgrade_id, e.quality,
              e.item_name, e.snapshot_timestamp
       FROM player_equipment e
       WHERE e.player_id IN ({list})
         AND e.id = (
           SELECT l.id FROM player_equipment l
           WHERE l.player_id = e.player_id AND l.slot_type = e.slot_type
           ORDER BY l.snapshot_timestamp DESC, l.id DESC
           LIMIT 1
         )
       ORDER BY e.player_id, e.slot_type"
    ))?;
    let mut rows = stmt.query(params_from_iter(chunk))?;
    while let Some(r) = rows.next()? {
      let Some(bundle) = bundles.get_mut(&r.get::<_, i64>(0)?) else { continue };
      let id: i64 = r.get(1)?;
      bundle.equipment.push(EquipmentRow {
        id,
        snapshot_timestamp: r.get::<_, Option<i64>>(7)?.unwrap_or_default(),
        item: EquippedItem {
          slot_type:    r.get::<_, Option<String>>(2)?.unwrap_or_default(),
          item_id:      r.get(3)?,
          upgrade_id:   r.get(4)?,
          quality:      r.get::<_, Option<String>>(5)?.unwrap_or_default(),
          item_name:    r.get::<_, Option<String>>(6)?.unwrap_or_default(),
          enchantments: enchantments_for(conn, id)?,
        },
      });
    }
  }

  best_run_ids.sort_unstable();
  best_run_ids.dedup();
  let members = members_by_run(conn, &best_run_ids)?;
  for bundle in bundles.values_mut() {
    for run in &mut bundle.best_runs {
      if let Some(team) = members.get(&run.run_id) {
        run.team_members = team.clone();
      }
    }
  }

  Ok(bundles)
}
