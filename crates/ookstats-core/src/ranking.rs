//! Ranking scopes and percentile brackets.
//!
//! A run ranking is keyed by a `(ranking_type, ranking_scope)` pair of text
//! columns. [`RankingScope`] is the typed form of that pair.

use std::fmt;

use crate::{Error, Result};

// ─── Ranking type / scope ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankingType {
  Global,
  Regional,
  Realm,
}

impl RankingType {
  pub const ALL: [Self; 3] = [Self::Global, Self::Regional, Self::Realm];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Global => "global",
      Self::Regional => "regional",
      Self::Realm => "realm",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "global" => Ok(Self::Global),
      "regional" => Ok(Self::Regional),
      "realm" => Ok(Self::Realm),
      other => Err(Error::UnknownRankingType(other.to_owned())),
    }
  }
}

/// Suffix appended to regional and realm scope keys for the one-run-per-team
/// variant.
pub const FILTERED_SUFFIX: &str = "_filtered";

/// A fully addressed ranking partition family.
///
/// `filtered` selects the variant keeping only each team's best run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RankingScope {
  Global { filtered: bool },
  Regional { region: String, filtered: bool },
  /// `pool` is the slug of the pool's leading realm.
  Realm { pool: String, filtered: bool },
}

impl RankingScope {
  pub fn ranking_type(&self) -> RankingType {
    match self {
      Self::Global { .. } => RankingType::Global,
      Self::Regional { .. } => RankingType::Regional,
      Self::Realm { .. } => RankingType::Realm,
    }
  }

  pub fn is_filtered(&self) -> bool {
    match self {
      Self::Global { filtered }
      | Self::Regional { filtered, .. }
      | Self::Realm { filtered, .. } => *filtered,
    }
  }

  /// The `ranking_scope` column value.
  pub fn scope_key(&self) -> String {
    match self {
      Self::Global { filtered: false } => "all".to_owned(),
      Self::Global { filtered: true } => "filtered".to_owned(),
      Self::Regional { region: key, filtered }
      | Self::Realm { pool: key, filtered } => {
        if *filtered {
          format!("{key}{FILTERED_SUFFIX}")
        } else {
          key.clone()
        }
      }
    }
  }

  /// Rebuild a scope from its stored column pair.
  pub fn from_columns(ranking_type: &str, ranking_scope: &str) -> Result<Self> {
    let (key, filtered) = match ranking_scope.strip_suffix(FILTERED_SUFFIX) {
      Some(base) => (base.to_owned(), true),
      None => (ranking_scope.to_owned(), false),
    };
    Ok(match RankingType::parse(ranking_type)? {
      RankingType::Global => Self::Global {
        filtered: ranking_scope == "filtered",
      },
      RankingType::Regional => Self::Regional { region: key, filtered },
      RankingType::Realm => Self::Realm { pool: key, filtered },
    })
  }
}

// ─── Brackets ────────────────────────────────────────────────────────────────

/// Coarse percentile label for a rank within a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bracket {
  Artifact,
  Excellent,
  Legendary,
  Epic,
  Rare,
  Uncommon,
  Common,
}

/// Upper bounds (inclusive, in percent) for each non-artifact bracket.
pub const BRACKET_THRESHOLDS: [(i64, Bracket); 5] = [
  (1, Bracket::Excellent),
  (5, Bracket::Legendary),
  (20, Bracket::Epic),
  (40, Bracket::Rare),
  (60, Bracket::Uncommon),
];

impl Bracket {
  /// Bracket for `rank` (1-based) among `total` entries.
  ///
  /// `at_minimum` is true when the entry's time equals the partition minimum;
  /// every such entry is `Artifact` regardless of rank.
  pub fn for_rank(rank: i64, total: i64, at_minimum: bool) -> Self {
    if at_minimum {
      return Self::Artifact;
    }
    if total <= 0 {
      return Self::Common;
    }
    BRACKET_THRESHOLDS
      .iter()
      .find(|(limit, _)| rank * 100 <= total * limit)
      .map(|(_, bracket)| *bracket)
      .unwrap_or(Self::Common)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Artifact => "artifact",
      Self::Excellent => "excellent",
      Self::Legendary => "legendary",
      Self::Epic => "epic",
      Self::Rare => "rare",
      Self::Uncommon => "uncommon",
      Self::Common => "common",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "artifact" => Ok(Self::Artifact),
      "excellent" => Ok(Self::Excellent),
      "legendary" => Ok(Self::Legendary),
      "epic" => Ok(Self::Epic),
      "rare" => Ok(Self::Rare),
      "uncommon" => Ok(Self::Uncommon),
      "common" => Ok(Self::Common),
      other => Err(Error::UnknownBracket(other.to_owned())),
    }
  }
}

impl fmt::Display for Bracket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minimum_time_is_always_artifact() {
    assert_eq!(Bracket::for_rank(1, 100, true), Bracket::Artifact);
    assert_eq!(Bracket::for_rank(3, 3, true), Bracket::Artifact);
  }

  #[test]
  fn boundaries_select_the_better_bracket() {
    assert_eq!(Bracket::for_rank(1, 100, false), Bracket::Excellent);
    assert_eq!(Bracket::for_rank(2, 100, false), Bracket::Legendary);
    assert_eq!(Bracket::for_rank(5, 100, false), Bracket::Legendary);
    assert_eq!(Bracket::for_rank(6, 100, false), Bracket::Epic);
    assert_eq!(Bracket::for_rank(20, 100, false), Bracket::Epic);
    assert_eq!(Bracket::for_rank(21, 100, false), Bracket::Rare);
    assert_eq!(Bracket::for_rank(40, 100, false), Bracket::Rare);
    assert_eq!(Bracket::for_rank(60, 100, false), Bracket::Uncommon);
    assert_eq!(Bracket::for_rank(61, 100, false), Bracket::Common);
  }

  #[test]
  fn small_partitions() {
    assert_eq!(Bracket::for_rank(2, 2, false), Bracket::Common);
    assert_eq!(Bracket::for_rank(1, 0, false), Bracket::Common);
  }

  #[test]
  fn scope_keys() {
    assert_eq!(RankingScope::Global { filtered: false }.scope_key(), "all");
    assert_eq!(RankingScope::Global { filtered: true }.scope_key(), "filtered");
    let regional = RankingScope::Regional { region: "eu".into(), filtered: true };
    assert_eq!(regional.scope_key(), "eu_filtered");
    let realm = RankingScope::Realm { pool: "pagle".into(), filtered: false };
    assert_eq!(realm.scope_key(), "pagle");
  }

  #[test]
  fn scope_from_columns() {
    let scope = RankingScope::from_columns("realm", "pagle_filtered").unwrap();
    assert_eq!(scope, RankingScope::Realm { pool: "pagle".into(), filtered: true });
    let scope = RankingScope::from_columns("global", "all").unwrap();
    assert_eq!(scope, RankingScope::Global { filtered: false });
    assert!(RankingScope::from_columns("galactic", "all").is_err());
  }

  #[test]
  fn bracket_text_round_trip() {
    for b in [
      Bracket::Artifact,
      Bracket::Excellent,
      Bracket::Legendary,
      Bracket::Epic,
      Bracket::Rare,
      Bracket::Uncommon,
      Bracket::Common,
    ] {
      assert_eq!(Bracket::parse(b.as_str()).unwrap(), b);
    }
  }
}
