//! Domain records shared by the fetcher, the store and the emitter.
//!
//! All timestamps are integer milliseconds since the Unix epoch.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Reference data ──────────────────────────────────────────────────────────

/// A realm known to the vendor API.
///
/// `id` is the connected-realm id used to address leaderboard endpoints. A
/// realm with a `parent_realm_slug` belongs to the pool led by that parent in
/// the same region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmInfo {
  pub id:                i64,
  pub name:              String,
  pub region:            String,
  pub slug:              String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_realm_slug: Option<String>,
}

/// A challenge mode dungeon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonInfo {
  pub id:   i64,
  pub name: String,
  pub slug: String,
}

// ─── Leaderboard payloads ────────────────────────────────────────────────────

/// One participant of a leaderboard run, normalized from either wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeaderboardMember {
  pub id:         Option<i64>,
  pub name:       String,
  pub realm_slug: Option<String>,
  pub spec_id:    Option<i64>,
  pub faction:    Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeaderboardRun {
  pub duration:            i64,
  pub completed_timestamp: i64,
  pub keystone_level:      i64,
  pub members:             Vec<LeaderboardMember>,
}

/// The runs reported for one (realm, dungeon, period) endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Leaderboard {
  pub period:                 i64,
  pub period_start_timestamp: i64,
  pub period_end_timestamp:   i64,
  pub runs:                   Vec<LeaderboardRun>,
}

impl Leaderboard {
  /// The newest completion in the payload, if it has any runs.
  pub fn max_completed_timestamp(&self) -> Option<i64> {
    self.runs.iter().map(|r| r.completed_timestamp).max()
  }
}

/// A successfully fetched leaderboard, addressed for persistence.
#[derive(Debug, Clone)]
pub struct LeaderboardBatchItem {
  pub region:      String,
  pub realm_slug:  String,
  pub dungeon:     DungeonInfo,
  pub period_id:   i64,
  pub leaderboard: Leaderboard,
}

/// Counters reported by one ingestion batch, or summed over a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
  pub processed:          usize,
  pub errors:             usize,
  pub skipped:            usize,
  pub runs_inserted:      usize,
  pub players_inserted:   usize,
  pub members_inserted:   usize,
  /// Members whose `(name, realm)` is already held by a different player id.
  /// Left for the fingerprint pass to reconcile.
  pub identity_conflicts: usize,
}

impl AddAssign for IngestStats {
  fn add_assign(&mut self, rhs: Self) {
    self.processed += rhs.processed;
    self.errors += rhs.errors;
    self.skipped += rhs.skipped;
    self.runs_inserted += rhs.runs_inserted;
    self.players_inserted += rhs.players_inserted;
    self.members_inserted += rhs.members_inserted;
    self.identity_conflicts += rhs.identity_conflicts;
  }
}

// ─── Fetch status ────────────────────────────────────────────────────────────

/// Maximum stored length of a fetch status message, in characters.
pub const FETCH_STATUS_MESSAGE_LIMIT: usize = 512;

/// Outcome class of one leaderboard request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
  Ok,
  Missing,
  Error,
}

impl FetchStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Ok => "ok",
      Self::Missing => "missing",
      Self::Error => "error",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "ok" => Ok(Self::Ok),
      "missing" => Ok(Self::Missing),
      "error" => Ok(Self::Error),
      other => Err(Error::UnknownFetchStatus(other.to_owned())),
    }
  }
}

/// A row of the `fetch_status` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStatusRecord {
  pub region:      String,
  pub realm_slug:  String,
  pub dungeon_id:  i64,
  pub period_id:   i64,
  pub status:      FetchStatus,
  pub http_status: Option<u16>,
  pub message:     Option<String>,
  pub checked_at:  i64,
}

impl FetchStatusRecord {
  /// Build a record, truncating `message` to [`FETCH_STATUS_MESSAGE_LIMIT`]
  /// characters and dropping it when blank.
  pub fn new(
    region: impl Into<String>,
    realm_slug: impl Into<String>,
    dungeon_id: i64,
    period_id: i64,
    status: FetchStatus,
    http_status: Option<u16>,
    message: Option<&str>,
    checked_at: i64,
  ) -> Self {
    let message = message
      .map(str::trim)
      .filter(|m| !m.is_empty())
      .map(|m| m.chars().take(FETCH_STATUS_MESSAGE_LIMIT).collect());
    Self {
      region: region.into(),
      realm_slug: realm_slug.into(),
      dungeon_id,
      period_id,
      status,
      http_status,
      message,
      checked_at,
    }
  }
}

/// Summary of one sweep, written to `api_fetch_metadata`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
  pub fetch_type:      String,
  pub timestamp:       i64,
  pub runs_fetched:    i64,
  pub players_fetched: i64,
}

// ─── Seasons ─────────────────────────────────────────────────────────────────

/// Season metadata as reported by the vendor for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonRecord {
  pub season_number:   i64,
  pub region:          String,
  pub season_name:     String,
  pub start_timestamp: i64,
  pub period_ids:      Vec<i64>,
}

/// A persisted season row. `end_timestamp == None` means active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Season {
  pub id:              i64,
  pub season_number:   i64,
  pub region:          String,
  pub season_name:     String,
  pub start_timestamp: i64,
  pub end_timestamp:   Option<i64>,
  pub first_period_id: Option<i64>,
  pub last_period_id:  Option<i64>,
}

impl Season {
  /// Whether `ts` falls in `[start, end)`; an open season has no end.
  pub fn contains(&self, ts: i64) -> bool {
    self.start_timestamp <= ts && self.end_timestamp.is_none_or(|end| ts < end)
  }
}

// ─── Character profiles ──────────────────────────────────────────────────────

/// A player selected for profile enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCandidate {
  pub player_id:  i64,
  pub name:       String,
  pub region:     String,
  pub realm_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharacterSummary {
  pub race_id:              i64,
  pub race_name:            String,
  pub gender:               String,
  pub class_id:             i64,
  pub class_name:           String,
  pub active_spec_id:       i64,
  pub active_spec_name:     String,
  pub guild_name:           Option<String>,
  pub level:                i64,
  pub average_item_level:   i64,
  pub equipped_item_level:  i64,
  pub last_login_timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemEnchantment {
  pub enchantment_id:   Option<i64>,
  pub slot_id:          Option<i64>,
  pub slot_type:        Option<String>,
  pub display_string:   Option<String>,
  pub source_item_id:   Option<i64>,
  pub source_item_name: Option<String>,
  pub spell_id:         Option<i64>,
}

impl ItemEnchantment {
  /// Stable text form used to compare enchantments across snapshots.
  pub fn signature(&self) -> String {
    format!(
      "{}|{}|{}|{}|{}|{}",
      self.enchantment_id.unwrap_or(-1),
      self.source_item_id.unwrap_or(-1),
      self.slot_id.unwrap_or(-1),
      self.slot_type.as_deref().unwrap_or(""),
      self.spell_id.unwrap_or(-1),
      self.display_string.as_deref().unwrap_or(""),
    )
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EquippedItem {
  pub slot_type:    String,
  pub item_id:      Option<i64>,
  pub upgrade_id:   Option<i64>,
  pub quality:      String,
  pub item_name:    String,
  pub enchantments: Vec<ItemEnchantment>,
}

impl EquippedItem {
  /// Sorted, `;`-joined enchantment signatures. Equal signatures mean the
  /// slot has not changed since the last snapshot.
  pub fn enchantment_signature(&self) -> String {
    let mut sigs: Vec<String> =
      self.enchantments.iter().map(ItemEnchantment::signature).collect();
    sigs.sort();
    sigs.join(";")
  }
}

/// Everything fetched for one character in a profile pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharacterProfile {
  pub summary:    CharacterSummary,
  pub equipment:  Vec<EquippedItem>,
  pub avatar_url: Option<String>,
}

/// Counters returned by a profile write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileWriteStats {
  pub details_written:     usize,
  pub equipment_changed:   usize,
  pub equipment_unchanged: usize,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_message_is_truncated_and_blank_dropped() {
    let long = "x".repeat(600);
    let rec = FetchStatusRecord::new(
      "us", "pagle", 2, 1020, FetchStatus::Error, Some(500), Some(&long), 0,
    );
    assert_eq!(rec.message.as_deref().map(str::len), Some(512));

    let rec = FetchStatusRecord::new(
      "us", "pagle", 2, 1020, FetchStatus::Ok, None, Some("   "), 0,
    );
    assert!(rec.message.is_none());
  }

  #[test]
  fn season_window_is_half_open() {
    let season = Season {
      id:              1,
      season_number:   5,
      region:          "us".into(),
      season_name:     "S5".into(),
      start_timestamp: 100,
      end_timestamp:   Some(200),
      first_period_id: None,
      last_period_id:  None,
    };
    assert!(season.contains(100));
    assert!(season.contains(199));
    assert!(!season.contains(200));
    assert!(!season.contains(99));

    let open = Season { end_timestamp: None, ..season };
    assert!(open.contains(i64::MAX));
  }

  #[test]
  fn enchantment_signature_ignores_order() {
    let a = ItemEnchantment { enchantment_id: Some(1), ..Default::default() };
    let b = ItemEnchantment { spell_id: Some(7), ..Default::default() };
    let one = EquippedItem { enchantments: vec![a.clone(), b.clone()], ..Default::default() };
    let two = EquippedItem { enchantments: vec![b, a], ..Default::default() };
    assert_eq!(one.enchantment_signature(), two.enchantment_signature());
  }

  #[test]
  fn fetch_status_round_trips_through_text() {
    for s in [FetchStatus::Ok, FetchStatus::Missing, FetchStatus::Error] {
      assert_eq!(FetchStatus::parse(s.as_str()).unwrap(), s);
    }
    assert!(FetchStatus::parse("weird").is_err());
  }
}
