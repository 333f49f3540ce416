//! In-place upgrades for databases created by older releases.
//!
//! Each step inspects the live schema and is a no-op when the upgrade has
//! already been applied, so the whole list runs on every open.

use rusqlite::{Connection, OptionalExtension as _};

pub(crate) type Step = fn(&mut Connection) -> rusqlite::Result<()>;

/// Ordered migration steps, named for error reporting.
pub(crate) const STEPS: &[(&str, Step)] = &[
  ("realms composite slug", realms_composite_slug),
  ("seasons per region", seasons_per_region),
  ("player identity columns", player_identity_columns),
];

fn table_sql(conn: &Connection, table: &str) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
      [table],
      |r| r.get(0),
    )
    .optional()
}

/// Lowercased DDL with whitespace runs collapsed to single spaces.
fn normalized_sql(conn: &Connection, table: &str) -> rusqlite::Result<String> {
  let sql = table_sql(conn, table)?.unwrap_or_default().to_lowercase();
  Ok(sql.split_whitespace().collect::<Vec<_>>().join(" "))
}

pub(crate) fn has_column(
  conn: &Connection,
  table: &str,
  column: &str,
) -> rusqlite::Result<bool> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
  let names = stmt.query_map([], |r| r.get::<_, String>(1))?;
  for name in names {
    if name?.eq_ignore_ascii_case(column) {
      return Ok(true);
    }
  }
  Ok(false)
}

// ─── Steps ───────────────────────────────────────────────────────────────────

/// Realm slugs used to be globally unique. The same slug exists in several
/// regions, so uniqueness moved to `(region, slug)`.
fn realms_composite_slug(conn: &mut Connection) -> rusqlite::Result<()> {
  if !normalized_sql(conn, "realms")?.contains("slug text unique") {
    return Ok(());
  }
  tracing::info!("migrating realms to per-region slugs");
  let tx = conn.transaction()?;
  tx.execute_batch(
    "CREATE TABLE realms_new (
         id                 INTEGER PRIMARY KEY,
         slug               TEXT,
         name               TEXT,
         region             TEXT,
         connected_realm_id INTEGER UNIQUE,
         parent_realm_slug  TEXT
     );
     INSERT INTO realms_new (id, slug, name, region, connected_realm_id, parent_realm_slug)
       SELECT id, slug, name, region, connected_realm_id, parent_realm_slug FROM realms;
     DROP TABLE realms;
     ALTER TABLE realms_new RENAME TO realms;",
  )?;
  tx.commit()
}

/// Seasons used to be global. Existing rows are attributed to `us`.
fn seasons_per_region(conn: &mut Connection) -> rusqlite::Result<()> {
  let sql = normalized_sql(conn, "seasons")?;
  if sql.is_empty() || sql.contains("region text") {
    return Ok(());
  }
  tracing::info!("migrating seasons to per-region rows");
  let tx = conn.transaction()?;
  tx.execute_batch(
    "CREATE TABLE seasons_new (
         id              INTEGER PRIMARY KEY AUTOINCREMENT,
         season_number   INTEGER NOT NULL,
         region          TEXT NOT NULL,
         start_timestamp INTEGER,
         end_timestamp   INTEGER,
         season_name     TEXT,
         first_period_id INTEGER,
         last_period_id  INTEGER,
         UNIQUE (season_number, region)
     );
     INSERT INTO seasons_new (id, season_number, region, start_timestamp,
                              end_timestamp, season_name, first_period_id, last_period_id)
       SELECT id, season_number, 'us', start_timestamp,
              end_timestamp, season_name, first_period_id, last_period_id
       FROM seasons;
     DROP TABLE seasons;
     ALTER TABLE seasons_new RENAME TO seasons;",
  )?;
  tx.commit()
}

/// Players gained a vendor character id, a validity flag and the time of
/// the last status check.
fn player_identity_columns(conn: &mut Connection) -> rusqlite::Result<()> {
  let tx = conn.transaction()?;
  if !has_column(&tx, "players", "blizzard_character_id")? {
    tx.execute_batch(
      "ALTER TABLE players ADD COLUMN blizzard_character_id INTEGER;
       UPDATE players SET blizzard_character_id = id WHERE blizzard_character_id IS NULL;",
    )?;
  }
  if !has_column(&tx, "players", "is_valid")? {
    tx.execute_batch(
      "ALTER TABLE players ADD COLUMN is_valid INTEGER DEFAULT 1;
       UPDATE players SET is_valid = 1 WHERE is_valid IS NULL;",
    )?;
  }
  if !has_column(&tx, "players", "status_checked_at")? {
    tx.execute_batch("ALTER TABLE players ADD COLUMN status_checked_at INTEGER;")?;
  }
  tx.commit()
}
