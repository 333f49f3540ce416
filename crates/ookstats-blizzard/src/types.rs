//! Wire shapes of vendor responses and their conversion into core records.
//!
//! Only the fields ookstats reads are modelled. Everything is defaulted so a
//! sparse payload still decodes.

use serde::Deserialize;

use ookstats_core::{
  identity::AchievementRecord,
  model::{
    CharacterSummary, EquippedItem, ItemEnchantment, Leaderboard, LeaderboardMember,
    LeaderboardRun, SeasonRecord,
  },
};

#[derive(Debug, Clone, Copy, Deserialize)]
struct IdRef {
  id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
  id:   i64,
  name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TypeRef {
  #[serde(rename = "type")]
  kind: String,
}

// ─── Leaderboards ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LeaderboardResponse {
  leading_groups:         Vec<WireRun>,
  period:                 i64,
  period_start_timestamp: i64,
  period_end_timestamp:   i64,
}

impl LeaderboardResponse {
  /// Convert, falling back to `requested_period` when the payload omits it.
  pub(crate) fn into_leaderboard(self, requested_period: i64) -> Leaderboard {
    Leaderboard {
      period:                 if self.period > 0 { self.period } else { requested_period },
      period_start_timestamp: self.period_start_timestamp,
      period_end_timestamp:   self.period_end_timestamp,
      runs:                   self.leading_groups.into_iter().map(Into::into).collect(),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireRun {
  duration:            i64,
  completed_timestamp: i64,
  keystone_level:      i64,
  members:             Vec<WireMember>,
}

impl From<WireRun> for LeaderboardRun {
  fn from(run: WireRun) -> Self {
    Self {
      duration:            run.duration,
      completed_timestamp: run.completed_timestamp,
      keystone_level:      run.keystone_level,
      members:             run.members.into_iter().map(Into::into).collect(),
    }
  }
}

/// A run member in either the flat or the nested (`profile`) layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireMember {
  id:             Option<i64>,
  name:           Option<String>,
  realm_slug:     Option<String>,
  spec_id:        Option<i64>,
  faction:        Option<WireFaction>,
  profile:        Option<WireProfile>,
  specialization: Option<IdRef>,
}

/// `"ALLIANCE"` in the flat layout, `{"type": "ALLIANCE"}` in the nested one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireFaction {
  Name(String),
  Typed {
    #[serde(rename = "type")]
    kind: String,
  },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireProfile {
  id:    Option<i64>,
  name:  Option<String>,
  realm: Option<WireSlug>,
}

#[derive(Debug, Deserialize)]
struct WireSlug {
  slug: String,
}

impl From<WireMember> for LeaderboardMember {
  fn from(m: WireMember) -> Self {
    let profile = m.profile.unwrap_or_default();
    let faction = m.faction.map(|f| match f {
      WireFaction::Name(name) => name,
      WireFaction::Typed { kind } => kind,
    });
    Self {
      id:         m.id.or(profile.id),
      name:       m.name.or(profile.name).unwrap_or_default(),
      realm_slug: m
        .realm_slug
        .or(profile.realm.map(|r| r.slug))
        .filter(|s| !s.is_empty()),
      spec_id:    m.spec_id.or(m.specialization.map(|s| s.id)),
      faction:    faction.filter(|f| !f.is_empty()),
    }
  }
}

// ─── Character profile ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SummaryResponse {
  level:                i64,
  race:                 Named,
  character_class:      Named,
  active_spec:          Named,
  gender:               TypeRef,
  guild:                Option<Named>,
  average_item_level:   i64,
  equipped_item_level:  i64,
  last_login_timestamp: Option<i64>,
}

impl From<SummaryResponse> for CharacterSummary {
  fn from(s: SummaryResponse) -> Self {
    Self {
      race_id:              s.race.id,
      race_name:            s.race.name,
      gender:               s.gender.kind,
      class_id:             s.character_class.id,
      class_name:           s.character_class.name,
      active_spec_id:       s.active_spec.id,
      active_spec_name:     s.active_spec.name,
      guild_name:           s.guild.map(|g| g.name).filter(|n| !n.is_empty()),
      level:                s.level,
      average_item_level:   s.average_item_level,
      equipped_item_level:  s.equipped_item_level,
      last_login_timestamp: s.last_login_timestamp,
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EquipmentResponse {
  equipped_items: Vec<WireItem>,
}

impl EquipmentResponse {
  /// Equipped items, dropping entries without a slot.
  pub(crate) fn into_items(self) -> Vec<EquippedItem> {
    self
      .equipped_items
      .into_iter()
      .filter(|i| !i.slot.kind.is_empty())
      .map(Into::into)
      .collect()
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireItem {
  item:         Option<IdRef>,
  slot:         TypeRef,
  name:         String,
  quality:      TypeRef,
  upgrade_id:   Option<i64>,
  enchantments: Vec<WireEnchantment>,
}

impl From<WireItem> for EquippedItem {
  fn from(i: WireItem) -> Self {
    Self {
      slot_type:    i.slot.kind,
      item_id:      i.item.map(|r| r.id),
      upgrade_id:   i.upgrade_id,
      quality:      i.quality.kind,
      item_name:    i.name,
      enchantments: i.enchantments.into_iter().map(Into::into).collect(),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireEnchantment {
  enchantment_id:   Option<i64>,
  enchantment_slot: Option<WireEnchantSlot>,
  display_string:   Option<String>,
  source_item:      Option<WireSourceItem>,
  spell:            Option<WireSpell>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireEnchantSlot {
  id:   Option<i64>,
  #[serde(rename = "type")]
  kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireSourceItem {
  id:   Option<i64>,
  name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSpell {
  spell: IdRef,
}

impl From<WireEnchantment> for ItemEnchantment {
  fn from(e: WireEnchantment) -> Self {
    let slot = e.enchantment_slot.unwrap_or_default();
    let source = e.source_item.unwrap_or_default();
    Self {
      enchantment_id:   e.enchantment_id,
      slot_id:          slot.id,
      slot_type:        slot.kind,
      display_string:   e.display_string,
      source_item_id:   source.id,
      source_item_name: source.name,
      spell_id:         e.spell.map(|s| s.spell.id),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MediaResponse {
  assets: Vec<MediaAsset>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaAsset {
  key:   String,
  value: String,
}

impl MediaResponse {
  pub(crate) fn avatar_url(self) -> Option<String> {
    self
      .assets
      .into_iter()
      .find(|a| a.key == "avatar" && !a.value.is_empty())
      .map(|a| a.value)
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AchievementsResponse {
  achievements: Vec<WireAchievement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireAchievement {
  id:                  i64,
  completed_timestamp: Option<i64>,
  criteria:            WireCriteria,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireCriteria {
  is_completed: bool,
}

impl AchievementsResponse {
  pub(crate) fn into_records(self) -> Vec<AchievementRecord> {
    self
      .achievements
      .into_iter()
      .map(|a| AchievementRecord {
        id:                  a.id,
        completed_timestamp: a.completed_timestamp,
        criteria_completed:  a.criteria.is_completed,
      })
      .collect()
  }
}

/// The vendor's verdict on a character, from its `/status` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterStatus {
  pub is_valid:     bool,
  pub reason:       Option<String>,
  /// The vendor's own character id, when reported.
  pub character_id: Option<i64>,
  /// Current name and realm as the vendor knows them.
  pub name:         Option<String>,
  pub realm_slug:   Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
  is_valid:  bool,
  #[serde(default)]
  reason:    Option<String>,
  #[serde(default)]
  character: Option<WireCharacter>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireCharacter {
  id:    i64,
  name:  String,
  realm: Option<WireSlug>,
}

impl From<StatusResponse> for CharacterStatus {
  fn from(s: StatusResponse) -> Self {
    let character = s.character.unwrap_or_default();
    Self {
      is_valid:     s.is_valid,
      reason:       s.reason.filter(|r| !r.is_empty()),
      character_id: Some(character.id).filter(|id| *id > 0),
      name:         Some(character.name).filter(|n| !n.trim().is_empty()),
      realm_slug:   character.realm.map(|r| r.slug).filter(|s| !s.is_empty()),
    }
  }
}

// ─── Periods and seasons ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PeriodIndexResponse {
  periods:        Vec<IdRef>,
  current_period: Option<IdRef>,
}

impl PeriodIndexResponse {
  /// Period ids, newest first, without duplicates.
  pub(crate) fn into_period_ids(self) -> Vec<i64> {
    let mut ids: Vec<i64> = self
      .periods
      .into_iter()
      .chain(self.current_period)
      .map(|p| p.id)
      .collect();
    ids.sort_unstable_by(|a, b| b.cmp(a));
    ids.dedup();
    ids
  }
}

/// Seasons known to the vendor for one region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeasonIndex {
  /// Ascending.
  pub season_ids: Vec<i64>,
  pub current:    Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SeasonIndexResponse {
  seasons:        Vec<IdRef>,
  current_season: Option<IdRef>,
}

impl From<SeasonIndexResponse> for SeasonIndex {
  fn from(r: SeasonIndexResponse) -> Self {
    let mut season_ids: Vec<i64> = r.seasons.into_iter().map(|s| s.id).collect();
    season_ids.sort_unstable();
    season_ids.dedup();
    Self { season_ids, current: r.current_season.map(|s| s.id) }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SeasonDetailResponse {
  id:              i64,
  start_timestamp: i64,
  season_name:     Option<String>,
  periods:         Vec<IdRef>,
}

impl SeasonDetailResponse {
  pub(crate) fn into_record(self, region: &str, requested_id: i64) -> SeasonRecord {
    let season_number = if self.id > 0 { self.id } else { requested_id };
    let season_name = self
      .season_name
      .filter(|n| !n.trim().is_empty())
      .unwrap_or_else(|| format!("Season {season_number}"));
    SeasonRecord {
      season_number,
      region: region.to_owned(),
      season_name,
      start_timestamp: self.start_timestamp,
      period_ids: self.periods.into_iter().map(|p| p.id).collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse<T: serde::de::DeserializeOwned>(json: &str) -> T {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn flat_and_nested_members_normalize_alike() {
    let flat: WireMember = parse(
      r#"{"id": 7, "name": "Ook", "realm_slug": "pagle", "spec_id": 268,
          "faction": "ALLIANCE"}"#,
    );
    let nested: WireMember = parse(
      r#"{"profile": {"id": 7, "name": "Ook", "realm": {"slug": "pagle"}},
          "specialization": {"id": 268}, "faction": {"type": "ALLIANCE"}}"#,
    );
    let expected = LeaderboardMember {
      id:         Some(7),
      name:       "Ook".into(),
      realm_slug: Some("pagle".into()),
      spec_id:    Some(268),
      faction:    Some("ALLIANCE".into()),
    };
    assert_eq!(LeaderboardMember::from(flat), expected);
    assert_eq!(LeaderboardMember::from(nested), expected);
  }

  #[test]
  fn member_without_ids_keeps_none() {
    let m: WireMember = parse(r#"{"name": "Ghost", "realm_slug": "", "faction": ""}"#);
    let m = LeaderboardMember::from(m);
    assert_eq!(m.id, None);
    assert_eq!(m.realm_slug, None);
    assert_eq!(m.faction, None);
  }

  #[test]
  fn equipment_keeps_enchantment_details() {
    let eq: EquipmentResponse = parse(
      r#"{"equipped_items": [
          {"item": {"id": 1}, "slot": {"type": "HEAD"}, "name": "Helm",
           "quality": {"type": "EPIC"},
           "enchantments": [{"enchantment_id": 4, "display_string": "+Stam",
             "enchantment_slot": {"id": 0, "type": "PERMANENT"},
             "source_item": {"id": 9, "name": "Arcanum"},
             "spell": {"spell": {"id": 77}}}]},
          {"item": {"id": 2}, "slot": {}, "name": "Nowhere"}
        ]}"#,
    );
    let items = eq.into_items();
    assert_eq!(items.len(), 1);
    let e = &items[0].enchantments[0];
    assert_eq!(items[0].slot_type, "HEAD");
    assert_eq!(e.slot_type.as_deref(), Some("PERMANENT"));
    assert_eq!(e.source_item_name.as_deref(), Some("Arcanum"));
    assert_eq!(e.spell_id, Some(77));
  }

  #[test]
  fn periods_sort_newest_first() {
    let idx: PeriodIndexResponse = parse(
      r#"{"periods": [{"id": 1020}, {"id": 1034}, {"id": 1025}],
          "current_period": {"id": 1034}}"#,
    );
    assert_eq!(idx.into_period_ids(), vec![1034, 1025, 1020]);
  }

  #[test]
  fn season_name_defaults_from_number() {
    let detail: SeasonDetailResponse =
      parse(r#"{"id": 11, "start_timestamp": 5, "periods": [{"id": 1020}]}"#);
    let rec = detail.into_record("eu", 11);
    assert_eq!(rec.season_name, "Season 11");
    assert_eq!(rec.region, "eu");
    assert_eq!(rec.period_ids, vec![1020]);
  }

  #[test]
  fn status_reports_vendor_character_id() {
    let s: StatusResponse = parse(
      r#"{"is_valid": false, "reason": "moved",
          "character": {"id": 42, "name": "Ook", "realm": {"slug": "pagle"}}}"#,
    );
    let s = CharacterStatus::from(s);
    assert!(!s.is_valid);
    assert_eq!(s.reason.as_deref(), Some("moved"));
    assert_eq!(s.character_id, Some(42));
    assert_eq!(s.realm_slug.as_deref(), Some("pagle"));

    let bare: StatusResponse = parse(r#"{"is_valid": true}"#);
    let bare = CharacterStatus::from(bare);
    assert_eq!((bare.character_id, bare.name), (None, None));
  }
}
