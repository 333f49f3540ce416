//! Character profile enrichment: candidate selection, alternate realms and
//! diffed equipment snapshots.

use rusqlite::{Connection, OptionalExtension as _, Transaction, params};

use ookstats_core::{
  model::{
    CharacterProfile, EquippedItem, ItemEnchantment, ProfileCandidate,
    ProfileWriteStats,
  },
  slug::merged_group_slugs,
};

use crate::store::sql_limit;

pub(crate) fn profile_candidates(
  conn: &Connection,
  stale_before: Option<i64>,
  limit: Option<usize>,
) -> rusqlite::Result<Vec<ProfileCandidate>> {
  let mut stmt = conn.prepare(
    "SELECT p.id, p.name, r.region, r.slug
     FROM players p
     JOIN realms r ON r.id = p.realm_id
     JOIN (
       SELECT player_id, MIN(global_ranking) AS best
       FROM player_profiles
       WHERE has_complete_coverage = 1
       GROUP BY player_id
     ) pp ON pp.player_id = p.id
     LEFT JOIN player_details pd ON pd.player_id = p.id
     WHERE p.is_valid = 1
       AND (pd.player_id IS NULL OR (?1 IS NOT NULL AND pd.last_updated < ?1))
     ORDER BY pp.best IS NULL, pp.best, p.id
     LIMIT ?2",
  )?;
  let rows = stmt.query_map(params![stale_before, sql_limit(limit)], |r| {
    Ok(ProfileCandidate {
      player_id:  r.get(0)?,
      name:       r.get(1)?,
      region:     r.get(2)?,
      realm_slug: r.get(3)?,
    })
  })?;
  rows.collect()
}

/// Realm slugs to try after a 404 on `realm_slug`: the rest of its pool,
/// then the realm of the player's most recent run in `region`.
pub(crate) fn alternate_realm_slugs(
  conn: &Connection,
  player_id: i64,
  region: &str,
  realm_slug: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut out: Vec<String> = Vec::new();
  let push = |slug: String, out: &mut Vec<String>| {
    if slug != realm_slug && !out.contains(&slug) {
      out.push(slug);
    }
  };

  let mut stmt = conn.prepare(
    "SELECT slug FROM realms
     WHERE region = ?1
       AND COALESCE(NULLIF(parent_realm_slug, ''), slug) = (
         SELECT COALESCE(NULLIF(parent_realm_slug, ''), slug)
         FROM realms WHERE region = ?1 AND slug = ?2
       )
     ORDER BY parent_realm_slug IS NOT NULL, slug",
  )?;
  let pool = stmt
    .query_map(params![region, realm_slug], |r| r.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  for slug in pool {
    push(slug, &mut out);
  }
  for slug in merged_group_slugs(region, realm_slug) {
    push(slug, &mut out);
  }

  let last: Option<String> = conn
    .query_row(
      "SELECT r.slug
       FROM run_members rm
       JOIN challenge_runs cr ON cr.id = rm.run_id
       JOIN realms r ON r.id = cr.realm_id
       WHERE rm.player_id = ?1 AND r.region = ?2
       ORDER BY cr.completed_timestamp DESC
       LIMIT 1",
      params![player_id, region],
      |r| r.get(0),
    )
    .optional()?;
  if let Some(slug) = last {
    push(slug, &mut out);
  }
  Ok(out)
}

pub(crate) fn save_character_profile(
  conn: &mut Connection,
  player_id: i64,
  profile: &CharacterProfile,
  snapshot_timestamp: i64,
) -> rusqlite::Result<ProfileWriteStats> {
  let mut stats = ProfileWriteStats::default();
  let s = &profile.summary;
  let tx = conn.transaction()?;

  tx.execute(
    "INSERT INTO player_details
       (player_id, race_id, race_name, gender, class_id, class_name, active_spec_id,
        active_spec_name, guild_name, level, average_item_level, equipped_item_level,
        avatar_url, last_login_timestamp, last_updated)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
     ON CONFLICT(player_id) DO UPDATE SET
       race_id              = excluded.race_id,
       race_name            = excluded.race_name,
       gender               = excluded.gender,
       class_id             = excluded.class_id,
       class_name           = excluded.class_name,
       active_spec_id       = excluded.active_spec_id,
       active_spec_name     = excluded.active_spec_name,
       guild_name           = excluded.guild_name,
       level                = excluded.level,
       average_item_level   = excluded.average_item_level,
       equipped_item_level  = excluded.equipped_item_level,
       avatar_url           = COALESCE(excluded.avatar_url, player_details.avatar_url),
       last_login_timestamp = excluded.last_login_timestamp,
       last_updated         = excluded.last_updated",
    params![
      player_id,
      s.race_id,
      s.race_name,
      s.gender,
      s.class_id,
      s.class_name,
      s.active_spec_id,
      s.active_spec_name,
      s.guild_name,
      s.level,
      s.average_item_level,
      s.equipped_item_level,
      profile.avatar_url,
      s.last_login_timestamp,
      snapshot_timestamp,
    ],
  )?;
  stats.details_written = 1;

  for item in &profile.equipment {
    let previous = latest_equipment(&tx, player_id, &item.slot_type)?;
    if previous.as_ref().is_some_and(|prev| same_content(prev, item)) {
      stats.equipment_unchanged += 1;
      continue;
    }
    insert_equipment(&tx, player_id, item, snapshot_timestamp)?;
    stats.equipment_changed += 1;
  }

  tx.commit()?;
  Ok(stats)
}

fn same_content(prev: &EquippedItem, next: &EquippedItem) -> bool {
  prev.item_id == next.item_id
    && prev.quality == next.quality
    && prev.item_name == next.item_name
    && prev.upgrade_id.unwrap_or(0) == next.upgrade_id.unwrap_or(0)
    && prev.enchantment_signature() == next.enchantment_signature()
}

fn latest_equipment(
  tx: &Transaction<'_>,
  player_id: i64,
  slot_type: &str,
) -> rusqlite::Result<Option<EquippedItem>> {
  let row: Option<(i64, EquippedItem)> = tx
    .query_row(
      "SELECT id, item_id, upgrade_id, quality, item_name
       FROM player_equipment
       WHERE player_id = ?1 AND slot_type = ?2
       ORDER BY snapshot_timestamp DESC, id DESC
       LIMIT 1",
      params![player_id, slot_type],
      |r| {
        Ok((r.get(0)?, EquippedItem {
          slot_type:    slot_type.to_owned(),
          item_id:      r.get(1)?,
          upgrade_id:   r.get(2)?,
          quality:      r.get::<_, Option<String>>(3)?.unwrap_or_default(),
          item_name:    r.get::<_, Option<String>>(4)?.unwrap_or_default(),
          enchantments: Vec::new(),
        }))
      },
    )
    .optional()?;
  let Some((equipment_id, mut item)) = row else {
    return Ok(None);
  };
  item.enchantments = enchantments_for(tx, equipment_id)?;
  Ok(Some(item))
}

pub(crate) fn enchantments_for(
  conn: &Connection,
  equipment_id: i64,
) -> rusqlite::Result<Vec<ItemEnchantment>> {
  let mut stmt = conn.prepare_cached(
    "SELECT enchantment_id, slot_id, slot_type, display_string, source_item_id,
            source_item_name, spell_id
     FROM player_equipment_enchantments
     WHERE equipment_id = ?1
     ORDER BY id",
  )?;
  let rows = stmt.query_map([equipment_id], |r| {
    Ok(ItemEnchantment {
      enchantment_id:   r.get(0)?,
      slot_id:          r.get(1)?,
      slot_type:        r.get(2)?,
      display_string:   r.get(3)?,
      source_item_id:   r.get(4)?,
      source_item_name: r.get(5)?,
      spell_id:         r.get(6)?,
    })
  })?;
  rows.collect()
}

fn insert_equipment(
  tx: &Transaction<'_>,
  player_id: i64,
  item: &EquippedItem,
  snapshot_timestamp: i64,
) -> rusqlite::Result<()> {
  tx.execute(
    "INSERT INTO player_equipment
       (player_id, slot_type, item_id, upgrade_id, quality, item_name, snapshot_timestamp)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      player_id,
      item.slot_type,
      item.item_id,
      item.upgrade_id,
      item.quality,
      item.item_name,
      snapshot_timestamp,
    ],
  )?;
  let equipment_id = tx.last_insert_rowid();
  for e in &item.enchantments {
    tx.execute(
      "INSERT INTO player_equipment_enchantments
         (equipment_id, enchantment_id, slot_id, slot_type, display_string,
          source_item_id, source_item_name, spell_id)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      params![
        equipment_id,
        e.enchantment_id,
        e.slot_id,
        e.slot_type,
        e.display_string,
        e.source_item_id,
        e.source_item_name,
        e.spell_id,
      ],
    )?;
  }
  Ok(())
}
