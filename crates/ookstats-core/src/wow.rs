//! Static game reference data: specializations, classes, challenge mode
//! dungeons, the realm catalog and the fallback period list.

use crate::model::{DungeonInfo, RealmInfo};

// ─── Specializations ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecInfo {
  pub spec_id:    i64,
  pub class_id:   i64,
  pub class_name: &'static str,
  pub spec_name:  &'static str,
}

const fn spec(
  spec_id: i64,
  class_id: i64,
  class_name: &'static str,
  spec_name: &'static str,
) -> SpecInfo {
  SpecInfo { spec_id, class_id, class_name, spec_name }
}

pub const SPECS: &[SpecInfo] = &[
  spec(71, 1, "Warrior", "Arms"),
  spec(72, 1, "Warrior", "Fury"),
  spec(73, 1, "Warrior", "Protection"),
  spec(65, 2, "Paladin", "Holy"),
  spec(66, 2, "Paladin", "Protection"),
  spec(70, 2, "Paladin", "Retribution"),
  spec(253, 3, "Hunter", "Beast Mastery"),
  spec(254, 3, "Hunter", "Marksmanship"),
  spec(255, 3, "Hunter", "Survival"),
  spec(259, 4, "Rogue", "Assassination"),
  spec(260, 4, "Rogue", "Outlaw"),
  spec(261, 4, "Rogue", "Subtlety"),
  spec(256, 5, "Priest", "Discipline"),
  spec(257, 5, "Priest", "Holy"),
  spec(258, 5, "Priest", "Shadow"),
  spec(250, 6, "Death Knight", "Blood"),
  spec(251, 6, "Death Knight", "Frost"),
  spec(252, 6, "Death Knight", "Unholy"),
  spec(262, 7, "Shaman", "Elemental"),
  spec(263, 7, "Shaman", "Enhancement"),
  spec(264, 7, "Shaman", "Restoration"),
  spec(62, 8, "Mage", "Arcane"),
  spec(63, 8, "Mage", "Fire"),
  spec(64, 8, "Mage", "Frost"),
  spec(265, 9, "Warlock", "Affliction"),
  spec(266, 9, "Warlock", "Demonology"),
  spec(267, 9, "Warlock", "Destruction"),
  spec(268, 10, "Monk", "Brewmaster"),
  spec(269, 10, "Monk", "Windwalker"),
  spec(270, 10, "Monk", "Mistweaver"),
  spec(102, 11, "Druid", "Balance"),
  spec(103, 11, "Druid", "Feral"),
  spec(104, 11, "Druid", "Guardian"),
  spec(105, 11, "Druid", "Restoration"),
];

pub fn spec_info(spec_id: i64) -> Option<&'static SpecInfo> {
  SPECS.iter().find(|s| s.spec_id == spec_id)
}

pub fn class_id_for_spec(spec_id: i64) -> Option<i64> {
  spec_info(spec_id).map(|s| s.class_id)
}

/// `(class_id, class_name)` for every playable class.
pub const CLASSES: &[(i64, &str)] = &[
  (1, "Warrior"),
  (2, "Paladin"),
  (3, "Hunter"),
  (4, "Rogue"),
  (5, "Priest"),
  (6, "Death Knight"),
  (7, "Shaman"),
  (8, "Mage"),
  (9, "Warlock"),
  (10, "Monk"),
  (11, "Druid"),
];

pub fn class_name(class_id: i64) -> Option<&'static str> {
  CLASSES.iter().find(|(id, _)| *id == class_id).map(|(_, n)| *n)
}

// ─── Dungeons ────────────────────────────────────────────────────────────────

pub const DUNGEONS: &[(i64, &str, &str)] = &[
  (2, "Temple of the Jade Serpent", "temple-of-the-jade-serpent"),
  (56, "Stormstout Brewery", "stormstout-brewery"),
  (57, "Gate of the Setting Sun", "gate-of-the-setting-sun"),
  (58, "Shado-Pan Monastery", "shado-pan-monastery"),
  (59, "Siege of Niuzao Temple", "siege-of-niuzao-temple"),
  (60, "Mogu'shan Palace", "mogu-shan-palace"),
  (76, "Scholomance", "scholomance"),
  (77, "Scarlet Halls", "scarlet-halls"),
  (78, "Scarlet Monastery", "scarlet-monastery"),
];

pub fn dungeons() -> Vec<DungeonInfo> {
  DUNGEONS
    .iter()
    .map(|(id, name, slug)| DungeonInfo {
      id:   *id,
      name: (*name).to_owned(),
      slug: (*slug).to_owned(),
    })
    .collect()
}

// ─── Realms ──────────────────────────────────────────────────────────────────

/// `(connected_realm_id, region, name, slug)` for every tracked realm.
pub const REALMS: &[(i64, &str, &str, &str)] = &[
  (4372, "us", "Atiesh", "atiesh"),
  (4373, "us", "Myzrael", "myzrael"),
  (4374, "us", "Old Blanchy", "old-blanchy"),
  (4376, "us", "Azuresong", "azuresong"),
  (4384, "us", "Mankrik", "mankrik"),
  (4385, "us", "Pagle", "pagle"),
  (4387, "us", "Ashkandi", "ashkandi"),
  (4388, "us", "Westfall", "westfall"),
  (4395, "us", "Whitemane", "whitemane"),
  (4408, "us", "Faerlina", "faerlina"),
  (4647, "us", "Grobbulus", "grobbulus"),
  (4648, "us", "Bloodsail Buccaneers", "bloodsail-buccaneers"),
  (4667, "us", "Remulos (AU)", "remulos-au"),
  (4669, "us", "Arugal (AU)", "arugal-au"),
  (4670, "us", "Yojamba (AU)", "yojamba-au"),
  (4725, "us", "Skyfury", "skyfury"),
  (4726, "us", "Sulfuras", "sulfuras"),
  (4727, "us", "Windseeker", "windseeker"),
  (4728, "us", "Benediction", "benediction"),
  (4731, "us", "Earthfury", "earthfury"),
  (4738, "us", "Maladath", "maladath"),
  (4795, "us", "Angerforge", "angerforge"),
  (4800, "us", "Eranikus", "eranikus"),
  (6359, "us", "Nazgrim", "nazgrim"),
  (6360, "us", "Galakras", "galakras"),
  (6361, "us", "Ra-den", "raden"),
  (6362, "us", "Lei Shen", "lei-shen"),
  (6363, "us", "Immerseus", "immerseus"),
  (4440, "eu", "Everlook", "everlook"),
  (4441, "eu", "Auberdine", "auberdine"),
  (4442, "eu", "Lakeshire", "lakeshire"),
  (4452, "eu", "Chromie", "chromie"),
  (4453, "eu", "Pyrewood Village", "pyrewood-village"),
  (4454, "eu", "Mirage Raceway", "mirage-raceway"),
  (4455, "eu", "Razorfen", "razorfen"),
  (4456, "eu", "Nethergarde Keep", "nethergarde-keep"),
  (4464, "eu", "Sulfuron", "sulfuron"),
  (4465, "eu", "Golemagg", "golemagg"),
  (4466, "eu", "Patchwerk", "patchwerk"),
  (4467, "eu", "Firemaw", "firemaw"),
  (4474, "eu", "Flamegor", "flamegor"),
  (4476, "eu", "Gehennas", "gehennas"),
  (4477, "eu", "Venoxis", "venoxis"),
  (4678, "eu", "Hydraxian Waterlords", "hydraxian-waterlords"),
  (4701, "eu", "Mograine", "mograine"),
  (4703, "eu", "Amnennar", "amnennar"),
  (4742, "eu", "Ashbringer", "ashbringer"),
  (4745, "eu", "Transcendence", "transcendence"),
  (4749, "eu", "Earthshaker", "earthshaker"),
  (4811, "eu", "Giantstalker", "giantstalker"),
  (4813, "eu", "Mandokir", "mandokir"),
  (4815, "eu", "Thekal", "thekal"),
  (4816, "eu", "Jin'do", "jindo"),
  (6364, "eu", "Shek'zeer", "shekzeer"),
  (6365, "eu", "Garalon", "garalon"),
  (6366, "eu", "Norushen", "norushen"),
  (6367, "eu", "Hoptallus", "hoptallus"),
  (6368, "eu", "Ook Ook", "ook-ook"),
  (4417, "kr", "Shimmering Flats", "shimmering-flats"),
  (4419, "kr", "Lokholar", "lokholar"),
  (4420, "kr", "Iceblood", "iceblood"),
  (4421, "kr", "Ragnaros", "ragnaros"),
  (4840, "kr", "Frostmourne", "frostmourne"),
  (4485, "tw", "Maraudon", "maraudon"),
  (4487, "tw", "Ivus", "ivus"),
  (4488, "tw", "Wushoolay", "wushoolay"),
  (4489, "tw", "Zeliek", "zeliek"),
  (5740, "tw", "Arathi Basin", "arathi-basin"),
  (5741, "tw", "Murloc", "murloc"),
  (5742, "tw", "Golemagg", "golemagg"),
  (5743, "tw", "Windseeker", "windseeker"),
];

/// The realm catalog, with merged children pointing at their parent.
pub fn realms() -> Vec<RealmInfo> {
  REALMS
    .iter()
    .map(|(id, region, name, slug)| RealmInfo {
      id:                *id,
      name:              (*name).to_owned(),
      region:            (*region).to_owned(),
      slug:              (*slug).to_owned(),
      parent_realm_slug: crate::slug::merged_parent(region, slug).map(str::to_owned),
    })
    .collect()
}

pub const DEFAULT_REGIONS: [&str; 4] = ["us", "eu", "kr", "tw"];

// ─── Periods ─────────────────────────────────────────────────────────────────

/// Periods swept, newest first, when the period index is unavailable.
pub fn fallback_periods() -> Vec<i64> {
  (1020..=1034).rev().collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn spec_lookup() {
    let s = spec_info(250).unwrap();
    assert_eq!(s.class_name, "Death Knight");
    assert_eq!(s.spec_name, "Blood");
    assert_eq!(class_id_for_spec(105), Some(11));
    assert_eq!(class_id_for_spec(1), None);
  }

  #[test]
  fn every_spec_class_is_known() {
    for s in SPECS {
      assert_eq!(class_name(s.class_id), Some(s.class_name));
    }
  }

  #[test]
  fn catalog_marks_merged_children() {
    let realms = realms();
    let nazgrim = realms.iter().find(|r| r.slug == "nazgrim").unwrap();
    assert_eq!(nazgrim.parent_realm_slug.as_deref(), Some("pagle"));
    let pagle = realms.iter().find(|r| r.slug == "pagle").unwrap();
    assert_eq!(pagle.parent_realm_slug, None);
    let tw_golemagg = realms
      .iter()
      .find(|r| r.slug == "golemagg" && r.region == "tw")
      .unwrap();
    assert_eq!(tw_golemagg.id, 5742);
  }

  #[test]
  fn fallback_periods_are_newest_first() {
    let p = fallback_periods();
    assert_eq!(p.first(), Some(&1034));
    assert_eq!(p.last(), Some(&1020));
    assert_eq!(p.len(), 15);
  }
}
