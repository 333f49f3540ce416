//! Character identity: fingerprints and team signatures.
//!
//! A fingerprint is derived from account-independent achievement timestamps
//! that survive name changes, faction changes and realm transfers. Two player
//! records with the same fingerprint are the same character.

use sha2::{Digest, Sha256};

use crate::{Error, Result};

// ─── Achievements ────────────────────────────────────────────────────────────

/// "Level 85" achievement.
pub const LEVEL_85_ACHIEVEMENT: i64 = 4826;
/// "Level 90" achievement.
pub const LEVEL_90_ACHIEVEMENT: i64 = 6193;

/// Heroic dungeon achievements; the earliest completion contributes to the
/// fingerprint. Sorted.
pub const HEROIC_ACHIEVEMENTS: [i64; 9] =
  [6456, 6470, 6756, 6758, 6759, 6760, 6761, 6762, 6763];

pub fn is_heroic_achievement(id: i64) -> bool {
  HEROIC_ACHIEVEMENTS.binary_search(&id).is_ok()
}

/// One entry of a character's achievement list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementRecord {
  pub id:                  i64,
  pub completed_timestamp: Option<i64>,
  pub criteria_completed:  bool,
}

/// The three achievement timestamps that feed a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestones {
  pub level85:         i64,
  pub level90:         i64,
  pub earliest_heroic: i64,
}

impl Milestones {
  /// Extract milestone timestamps, using the earliest completion of each.
  ///
  /// Entries without a completion timestamp or with incomplete criteria are
  /// ignored. Fails when any milestone is absent.
  pub fn from_achievements<'a>(
    achievements: impl IntoIterator<Item = &'a AchievementRecord>,
  ) -> Result<Self> {
    let mut level85: Option<i64> = None;
    let mut level90: Option<i64> = None;
    let mut heroic: Option<i64> = None;

    for a in achievements {
      let Some(ts) = a.completed_timestamp.filter(|_| a.criteria_completed) else {
        continue;
      };
      let slot = match a.id {
        LEVEL_85_ACHIEVEMENT => &mut level85,
        LEVEL_90_ACHIEVEMENT => &mut level90,
        id if is_heroic_achievement(id) => &mut heroic,
        _ => continue,
      };
      *slot = Some(slot.map_or(ts, |cur| cur.min(ts)));
    }

    Ok(Self {
      level85:         level85.ok_or(Error::MissingMilestone("level 85"))?,
      level90:         level90.ok_or(Error::MissingMilestone("level 90"))?,
      earliest_heroic: heroic.ok_or(Error::MissingMilestone("heroic dungeon"))?,
    })
  }
}

// ─── Fingerprint ─────────────────────────────────────────────────────────────

/// Lowercase hex SHA-256 of `"{class_id}:{l85}:{l90}:{heroic}"`.
pub fn fingerprint_hash(class_id: i64, milestones: &Milestones) -> String {
  let input = format!(
    "{class_id}:{}:{}:{}",
    milestones.level85, milestones.level90, milestones.earliest_heroic
  );
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}

/// A player lacking a fingerprint, with what the store knows about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintCandidate {
  pub player_id:             i64,
  pub name:                  String,
  pub region:                String,
  pub realm_slug:            String,
  pub blizzard_character_id: Option<i64>,
  /// From stored character details, when a profile pass has run.
  pub details_class_id:      Option<i64>,
  /// Spec of the player's most recent run membership.
  pub latest_spec_id:        Option<i64>,
  pub first_run_timestamp:   Option<i64>,
  pub last_run_timestamp:    Option<i64>,
}

impl FingerprintCandidate {
  /// Class from stored details, else from the most recent spec.
  pub fn class_id(&self) -> Option<i64> {
    self
      .details_class_id
      .filter(|c| *c > 0)
      .or_else(|| self.latest_spec_id.and_then(crate::wow::class_id_for_spec))
  }
}

/// A row of `player_fingerprints`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerFingerprint {
  pub player_id:             i64,
  pub fingerprint_hash:      String,
  pub class_id:              i64,
  pub milestones:            Milestones,
  /// Vendor character id from the status check, when it reported one.
  pub blizzard_character_id: Option<i64>,
  pub last_seen_name:        String,
  pub last_seen_realm_slug:  String,
  pub last_seen_timestamp:   i64,
  pub first_run_timestamp:   i64,
  pub created_at:            i64,
}

// ─── Team signature ──────────────────────────────────────────────────────────

/// Canonical identity of a team: member ids sorted ascending, joined by `,`.
pub fn team_signature(member_ids: &[i64]) -> String {
  let mut ids = member_ids.to_vec();
  ids.sort_unstable();
  ids
    .iter()
    .map(i64::to_string)
    .collect::<Vec<_>>()
    .join(",")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn done(id: i64, ts: i64) -> AchievementRecord {
    AchievementRecord { id, completed_timestamp: Some(ts), criteria_completed: true }
  }

  #[test]
  fn fingerprint_matches_sha256_of_canonical_text() {
    let m = Milestones { level85: 1, level90: 2, earliest_heroic: 3 };
    let mut hasher = Sha256::new();
    hasher.update(b"7:1:2:3");
    assert_eq!(fingerprint_hash(7, &m), hex::encode(hasher.finalize()));
    assert_eq!(fingerprint_hash(7, &m).len(), 64);
  }

  #[test]
  fn milestones_take_earliest_heroic() {
    let list = [
      done(LEVEL_85_ACHIEVEMENT, 100),
      done(LEVEL_90_ACHIEVEMENT, 200),
      done(6760, 500),
      done(6456, 300),
      done(9999, 1),
    ];
    let m = Milestones::from_achievements(&list).unwrap();
    assert_eq!(m, Milestones { level85: 100, level90: 200, earliest_heroic: 300 });
  }

  #[test]
  fn incomplete_criteria_are_ignored() {
    let list = [
      done(LEVEL_85_ACHIEVEMENT, 100),
      done(LEVEL_90_ACHIEVEMENT, 200),
      AchievementRecord {
        id:                  6456,
        completed_timestamp: Some(50),
        criteria_completed:  false,
      },
    ];
    assert!(matches!(
      Milestones::from_achievements(&list),
      Err(Error::MissingMilestone("heroic dungeon"))
    ));
  }

  #[test]
  fn missing_level_milestone_fails() {
    let list = [done(LEVEL_90_ACHIEVEMENT, 200), done(6456, 300)];
    assert!(Milestones::from_achievements(&list).is_err());
  }

  #[test]
  fn team_signature_is_order_independent() {
    assert_eq!(team_signature(&[5, 3, 1, 4, 2]), "1,2,3,4,5");
    assert_eq!(team_signature(&[2, 1]), team_signature(&[1, 2]));
  }

  #[test]
  fn candidate_class_prefers_details() {
    let mut c = FingerprintCandidate {
      player_id:             1,
      name:                  "a".into(),
      region:                "us".into(),
      realm_slug:            "pagle".into(),
      blizzard_character_id: None,
      details_class_id:      Some(8),
      latest_spec_id:        Some(71),
      first_run_timestamp:   None,
      last_run_timestamp:    None,
    };
    assert_eq!(c.class_id(), Some(8));
    c.details_class_id = None;
    assert_eq!(c.class_id(), Some(1));
    c.latest_spec_id = None;
    assert_eq!(c.class_id(), None);
  }
}
