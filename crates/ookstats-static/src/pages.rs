//! JSON shapes of every emitted file.

use std::collections::BTreeMap;

use serde::Serialize;

use ookstats_core::model::ItemEnchantment;
use ookstats_store_sqlite::loader::MemberRow;

use crate::pagination::Pagination;

// ─── Run leaderboards ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardPage {
  pub leading_groups:  Vec<LeadingGroup>,
  pub map:             MapInfo,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub connected_realm: Option<ConnectedRealm>,
  pub pagination:      Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadingGroup {
  pub id:                  i64,
  pub duration:            i64,
  pub completed_timestamp: i64,
  pub keystone_level:      i64,
  pub dungeon_name:        String,
  pub realm_name:          String,
  pub region:              String,
  pub members:             Vec<Member>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ranking_percentile:  Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Member {
  pub name:       String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub spec_id:    Option<i64>,
  pub region:     String,
  pub realm_slug: String,
}

impl From<&MemberRow> for Member {
  fn from(m: &MemberRow) -> Self {
    Self {
      name:       m.name.clone(),
      spec_id:    m.spec_id,
      region:     m.region.clone(),
      realm_slug: m.realm_slug.clone(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapInfo {
  pub name: LocalizedName,
}

impl MapInfo {
  pub fn named(name: &str) -> Self {
    Self { name: LocalizedName { en_us: name.to_owned() } }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalizedName {
  #[serde(rename = "en_US")]
  pub en_us: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectedRealm {
  pub name: String,
}

// ─── Player leaderboards ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PlayerLeaderboardPage {
  pub leaderboard:         Vec<PlayerEntry>,
  pub title:               String,
  pub generated_timestamp: i64,
  pub pagination:          Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerEntry {
  pub player_id:          i64,
  pub name:               String,
  pub realm_slug:         String,
  pub realm_name:         String,
  pub region:             String,
  pub class_name:         String,
  pub active_spec_name:   String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub main_spec_id:       Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub combined_best_time: Option<i64>,
  pub dungeons_completed: i64,
  pub total_runs:         i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ranking_percentile: Option<String>,
}

// ─── Player pages ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PlayerPage {
  pub player:       PlayerDoc,
  pub equipment:    BTreeMap<String, EquipmentDoc>,
  pub generated_at: i64,
  pub version:      &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerDoc {
  pub id:                  i64,
  pub name:                String,
  pub realm_slug:          String,
  pub realm_name:          String,
  pub region:              String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub class_name:          Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub active_spec_name:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avatar_url:          Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub guild_name:          Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub race_name:           Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub average_item_level:  Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub equipped_item_level: Option<i64>,
  /// Keyed by season id.
  pub seasons:             BTreeMap<String, SeasonDoc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonDoc {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub main_spec_id:             Option<i64>,
  pub dungeons_completed:       i64,
  pub total_runs:               i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub combined_best_time:       Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub global_ranking:           Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub regional_ranking:         Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub realm_ranking:            Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub global_ranking_bracket:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub regional_ranking_bracket: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub realm_ranking_bracket:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_updated:             Option<i64>,
  /// Keyed by dungeon slug.
  pub best_runs:                BTreeMap<String, BestRunDoc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestRunDoc {
  pub dungeon_id:                  i64,
  pub dungeon_name:                String,
  pub dungeon_slug:                String,
  pub run_id:                      i64,
  pub duration:                    i64,
  pub completed_timestamp:         i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub global_ranking_filtered:     Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub regional_ranking_filtered:   Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub realm_ranking_filtered:      Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub global_percentile_bracket:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub regional_percentile_bracket: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub realm_percentile_bracket:    Option<String>,
  pub team_members:                Vec<Member>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentDoc {
  pub id:                 i64,
  pub slot_type:          String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub item_id:            Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub upgrade_id:         Option<i64>,
  pub quality:            String,
  pub item_name:          String,
  pub snapshot_timestamp: i64,
  /// Always null; no item reference data is bundled.
  pub item_icon_slug:     Option<String>,
  pub item_type:          Option<String>,
  pub enchantments:       Vec<EnchantmentDoc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnchantmentDoc {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub enchantment_id:   Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slot_id:          Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub slot_type:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_string:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_item_id:   Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_item_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub spell_id:         Option<i64>,
}

impl From<&ItemEnchantment> for EnchantmentDoc {
  fn from(e: &ItemEnchantment) -> Self {
    Self {
      enchantment_id:   e.enchantment_id,
      slot_id:          e.slot_id,
      slot_type:        e.slot_type.clone(),
      display_string:   e.display_string.clone(),
      source_item_id:   e.source_item_id,
      source_item_name: e.source_item_name.clone(),
      spell_id:         e.spell_id,
    }
  }
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SearchShard {
  pub players:  Vec<SearchEntry>,
  pub metadata: SearchMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchEntry {
  pub id:                     i64,
  pub name:                   String,
  pub region:                 String,
  pub realm_slug:             String,
  pub realm_name:             String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub class_name:             Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub global_ranking:         Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub global_ranking_bracket: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
  pub total_players:    usize,
  pub returned_players: usize,
  pub offset:           usize,
  pub limit:            usize,
  pub last_updated:     String,
}

// ─── Queue payload ───────────────────────────────────────────────────────────

/// Any page the writer pool accepts.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Page {
  Leaderboard(LeaderboardPage),
  Players(PlayerLeaderboardPage),
  Player(Box<PlayerPage>),
  Search(SearchShard),
}
