//! Realm and dungeon reference rows.

use rusqlite::{Connection, OptionalExtension as _, params};

use ookstats_core::{
  model::{DungeonInfo, RealmInfo},
  slug::merged_parent,
};

pub(crate) fn ensure_reference_data(
  conn: &mut Connection,
  realms: &[RealmInfo],
  dungeons: &[DungeonInfo],
) -> rusqlite::Result<()> {
  let tx = conn.transaction()?;
  {
    let mut upsert_realm = tx.prepare(
      "INSERT INTO realms (slug, name, region, connected_realm_id, parent_realm_slug)
       VALUES (?1, ?2, ?3, ?4, ?5)
       ON CONFLICT(region, slug) DO UPDATE SET
         parent_realm_slug  = COALESCE(NULLIF(realms.parent_realm_slug, ''), excluded.parent_realm_slug),
         connected_realm_id = COALESCE(realms.connected_realm_id, excluded.connected_realm_id),
         name = CASE
                  WHEN realms.name IS NULL OR realms.name = '' OR realms.name = realms.slug
                  THEN excluded.name
                  ELSE realms.name
                END",
    )?;
    for realm in realms {
      let parent = realm
        .parent_realm_slug
        .as_deref()
        .filter(|p| !p.is_empty() && *p != realm.slug);
      upsert_realm.execute(params![
        realm.slug,
        realm.name,
        realm.region,
        realm.id,
        parent,
      ])?;
    }

    let mut insert_dungeon = tx.prepare(
      "INSERT OR IGNORE INTO dungeons (id, slug, name, map_challenge_mode_id)
       VALUES (?1, ?2, ?3, ?1)",
    )?;
    for dungeon in dungeons {
      insert_dungeon.execute(params![dungeon.id, dungeon.slug, dungeon.name])?;
    }
  }
  tx.commit()
}

pub(crate) fn realm_id(
  conn: &Connection,
  region: &str,
  slug: &str,
) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row(
      "SELECT id FROM realms WHERE region = ?1 AND slug = ?2",
      params![region, slug],
      |r| r.get(0),
    )
    .optional()
}

/// Resolve a realm, creating a placeholder row (`name = slug`) when the slug
/// has not been seen in `region`.
pub(crate) fn ensure_realm(
  conn: &Connection,
  region: &str,
  slug: &str,
) -> rusqlite::Result<i64> {
  if let Some(id) = realm_id(conn, region, slug)? {
    return Ok(id);
  }
  conn.execute(
    "INSERT INTO realms (slug, name, region, parent_realm_slug) VALUES (?1, ?1, ?2, ?3)",
    params![slug, region, merged_parent(region, slug)],
  )?;
  tracing::debug!(region, slug, "created placeholder realm");
  Ok(conn.last_insert_rowid())
}

pub(crate) fn dungeon_id(conn: &Connection, slug: &str) -> rusqlite::Result<Option<i64>> {
  conn
    .query_row("SELECT id FROM dungeons WHERE slug = ?1", [slug], |r| r.get(0))
    .optional()
}
