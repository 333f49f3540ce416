//! Emitter tests against an in-memory store, writing under the system temp
//! directory.

use std::{
  collections::BTreeMap,
  fs,
  path::{Path, PathBuf},
  sync::atomic::{AtomicUsize, Ordering},
};

use ookstats_core::{
  model::{
    DungeonInfo, Leaderboard, LeaderboardBatchItem, LeaderboardMember, LeaderboardRun, RealmInfo,
    SeasonRecord,
  },
  store::RunStore,
};
use ookstats_store_sqlite::SqliteStore;
use serde_json::Value;

use crate::{EmitOptions, emit, writer};

const SEASON_START: i64 = 1_690_000_000_000;
const T0: i64 = 1_700_000_000_000;

static SCRATCH: AtomicUsize = AtomicUsize::new(0);

/// A fresh, empty directory under the system temp dir.
fn scratch(name: &str) -> PathBuf {
  let n = SCRATCH.fetch_add(1, Ordering::Relaxed);
  let dir = std::env::temp_dir().join(format!("ookstats-static-{name}-{}-{n}", std::process::id()));
  let _ = fs::remove_dir_all(&dir);
  fs::create_dir_all(&dir).unwrap();
  dir
}

fn realm(id: i64, slug: &str, name: &str, parent: Option<&str>) -> RealmInfo {
  RealmInfo {
    id,
    name: name.into(),
    region: "us".into(),
    slug: slug.into(),
    parent_realm_slug: parent.map(Into::into),
  }
}

fn dungeon(id: i64) -> DungeonInfo {
  DungeonInfo { id, name: format!("Dungeon {id}"), slug: format!("dungeon-{id}") }
}

fn run(duration: i64, ts: i64, id: i64) -> LeaderboardRun {
  LeaderboardRun {
    duration,
    completed_timestamp: ts,
    keystone_level: 1,
    members: vec![LeaderboardMember {
      id:         Some(id),
      name:       format!("P{id}"),
      realm_slug: None,
      spec_id:    Some(71),
      faction:    Some("ALLIANCE".into()),
    }],
  }
}

fn item(realm_slug: &str, dungeon_id: i64, runs: Vec<LeaderboardRun>) -> LeaderboardBatchItem {
  LeaderboardBatchItem {
    region: "us".into(),
    realm_slug: realm_slug.into(),
    dungeon: dungeon(dungeon_id),
    period_id: 1020,
    leaderboard: Leaderboard {
      period: 1020,
      period_start_timestamp: T0 - 1000,
      period_end_timestamp: T0 + 1000,
      runs,
    },
  }
}

/// Pagle with its merged child nazgrim. Players 1 (pagle) and 2 (nazgrim)
/// complete both dungeons; player 3 (pagle) only the first.
async fn ranked_store() -> SqliteStore {
  let s = SqliteStore::open_in_memory().await.unwrap();
  s.ensure_reference_data(
    vec![realm(10, "pagle", "Pagle", None), realm(11, "nazgrim", "Nazgrim", Some("pagle"))],
    vec![dungeon(1), dungeon(2)],
  )
  .await
  .unwrap();
  s.sync_season(SeasonRecord {
    season_number:   5,
    region:          "us".into(),
    season_name:     "Season 5".into(),
    start_timestamp: SEASON_START,
    period_ids:      vec![1020],
  })
  .await
  .unwrap();
  s.ingest_batch(vec![
    item("pagle", 1, vec![run(100_000, T0, 1), run(90_000, T0 + 1, 3)]),
    item("pagle", 2, vec![run(200_000, T0, 1)]),
    item("nazgrim", 1, vec![run(110_000, T0, 2)]),
    item("nazgrim", 2, vec![run(200_000, T0 + 2, 2)]),
  ])
  .await
  .unwrap();
  s.rebuild_rankings().await.unwrap();
  s
}

fn options(out: &Path) -> EmitOptions {
  EmitOptions { out: out.to_owned(), regions: vec!["us".into()], ..EmitOptions::default() }
}

fn read(path: &Path) -> Value {
  let raw = fs::read(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
  serde_json::from_slice(&raw).unwrap()
}

/// Every file under `dir`, keyed by relative path.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
  fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        walk(root, &path, out);
      } else {
        out.insert(path.strip_prefix(root).unwrap().to_owned(), fs::read(&path).unwrap());
      }
    }
  }
  let mut out = BTreeMap::new();
  walk(dir, dir, &mut out);
  out
}

// ─── Layout ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merged_realms_publish_under_pool_leader() {
  let s = ranked_store().await;
  let out = scratch("pool");
  emit(&s, &options(&out)).await.unwrap();
  let season = out.join("api/season/5");

  let page = read(&season.join("us/pagle/dungeon-1/1.json"));
  assert!(!season.join("us/nazgrim").exists());
  assert_eq!(page["connected_realm"]["name"], "Pagle");
  assert_eq!(page["map"]["name"]["en_US"], "Dungeon 1");
  let realms: Vec<&str> = page["leading_groups"]
    .as_array()
    .unwrap()
    .iter()
    .map(|g| g["realm_name"].as_str().unwrap())
    .collect();
  assert_eq!(realms, vec!["Pagle", "Pagle", "Nazgrim"]);

  assert!(season.join("players/realm/us/pagle/1.json").exists());
  assert!(!season.join("players/realm/us/nazgrim").exists());

  // Player pages keep the character's own realm.
  let p2 = read(&out.join("api/player/us/nazgrim/p2.json"));
  assert_eq!(p2["player"]["realm_slug"], "nazgrim");
  assert!(p2["player"]["seasons"]["5"]["best_runs"]["dungeon-2"].is_object());
  assert!(!out.join("api/player/us/pagle/p3.json").exists());

  fs::remove_dir_all(&out).unwrap();
}

#[tokio::test]
async fn leaderboard_pages_follow_rank_order() {
  let s = ranked_store().await;
  let out = scratch("ranks");
  let summary = emit(&s, &options(&out)).await.unwrap();
  assert_eq!(summary.seasons, 1);
  assert!(summary.written > 0);

  let global = read(&out.join("api/season/5/global/dungeon-1/1.json"));
  let durations: Vec<i64> = global["leading_groups"]
    .as_array()
    .unwrap()
    .iter()
    .map(|g| g["duration"].as_i64().unwrap())
    .collect();
  assert_eq!(durations, vec![90_000, 100_000, 110_000]);
  assert!(global.get("connected_realm").is_none());
  assert_eq!(global["leading_groups"][0]["members"][0]["name"], "P3");
  assert_eq!(global["leading_groups"][0]["ranking_percentile"], "artifact");
  assert_eq!(global["pagination"]["totalRuns"], 3);

  let regional = read(&out.join("api/season/5/us/all/dungeon-2/1.json"));
  assert_eq!(regional["leading_groups"].as_array().unwrap().len(), 2);

  let players = read(&out.join("api/season/5/players/global/1.json"));
  assert_eq!(players["title"], "Global Player Rankings");
  assert_eq!(players["leaderboard"][0]["player_id"], 1);
  assert_eq!(players["leaderboard"][0]["class_name"], "Warrior");
  assert_eq!(players["leaderboard"][1]["combined_best_time"], 310_000);
  assert_eq!(players["pagination"]["totalPlayers"], 2);

  let class = read(&out.join("api/season/5/players/class/warrior/regional/us/1.json"));
  assert_eq!(class["title"], "US Player Rankings");
  assert_eq!(class["leaderboard"].as_array().unwrap().len(), 2);

  fs::remove_dir_all(&out).unwrap();
}

#[tokio::test]
async fn page_boundaries() {
  let s = ranked_store().await;
  let out = scratch("pages");
  emit(&s, &EmitOptions { page_size: 1, ..options(&out) }).await.unwrap();
  let dir = out.join("api/season/5/players/global");

  let first = read(&dir.join("1.json"));
  assert_eq!(first["pagination"]["totalPages"], 2);
  assert_eq!(first["pagination"]["hasNextPage"], true);
  assert_eq!(first["pagination"]["hasPrevPage"], false);
  let last = read(&dir.join("2.json"));
  assert_eq!(last["pagination"]["hasNextPage"], false);
  assert_eq!(last["pagination"]["hasPrevPage"], true);
  assert!(!dir.join("3.json").exists());

  fs::remove_dir_all(&out).unwrap();
}

#[tokio::test]
async fn search_shards_are_compact() {
  let s = ranked_store().await;
  let out = scratch("search");
  emit(&s, &EmitOptions { shard_size: 1, ..options(&out) }).await.unwrap();
  let dir = out.join("api/search");

  let raw = fs::read_to_string(dir.join("players-001.json")).unwrap();
  assert!(!raw.contains('\n'));
  let shard: Value = serde_json::from_str(&raw).unwrap();
  assert_eq!(shard["players"][0]["id"], 2);
  assert_eq!(shard["metadata"]["offset"], 1);
  assert_eq!(shard["metadata"]["total_players"], 2);
  assert_eq!(shard["metadata"]["returned_players"], 1);
  assert!(!dir.join("players-002.json").exists());

  let pretty = fs::read_to_string(out.join("api/season/5/players/global/1.json")).unwrap();
  assert!(pretty.contains("\n  "));

  fs::remove_dir_all(&out).unwrap();
}

#[tokio::test]
async fn region_filter_drops_other_regions() {
  let s = ranked_store().await;
  let out = scratch("regions");
  emit(&s, &EmitOptions { regions: vec!["eu".into()], ..options(&out) }).await.unwrap();
  let season = out.join("api/season/5");

  assert!(season.join("global/dungeon-1/1.json").exists());
  assert!(!season.join("us").exists());
  assert!(!season.join("players/regional/us").exists());

  fs::remove_dir_all(&out).unwrap();
}

#[tokio::test]
async fn disabled_sections_write_nothing() {
  let s = ranked_store().await;
  let out = scratch("sections");
  let summary = emit(&s, &EmitOptions {
    leaderboards: false,
    search: false,
    ..options(&out)
  })
  .await
  .unwrap();
  assert_eq!(summary.leaderboard_pages, 0);
  assert_eq!(summary.player_pages, 2);
  assert!(!out.join("api/season").exists());
  assert!(!out.join("api/search").exists());

  fs::remove_dir_all(&out).unwrap();
}

// ─── Idempotence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn emitting_twice_gives_identical_bytes() {
  let s = ranked_store().await;
  let out = scratch("twice");
  emit(&s, &options(&out)).await.unwrap();
  let first = snapshot(&out);
  emit(&s, &options(&out)).await.unwrap();
  let second = snapshot(&out);

  assert!(!first.is_empty());
  assert_eq!(first.keys().collect::<Vec<_>>(), second.keys().collect::<Vec<_>>());
  assert!(first == second, "emitted bytes changed between runs");
  assert!(
    first.keys().all(|p| !p.to_string_lossy().contains(".tmp-")),
    "temp files left behind"
  );

  fs::remove_dir_all(&out).unwrap();
}

// ─── Atomic writes ───────────────────────────────────────────────────────────

#[test]
fn atomic_write_creates_parents_and_replaces() {
  let out = scratch("atomic");
  let path = out.join("a/b/page.json");
  writer::write_atomic(&path, b"one").unwrap();
  writer::write_atomic(&path, b"two").unwrap();
  assert_eq!(fs::read(&path).unwrap(), b"two");
  assert_eq!(fs::read_dir(out.join("a/b")).unwrap().count(), 1);

  fs::remove_dir_all(&out).unwrap();
}

#[test]
fn failed_write_leaves_no_temp_file() {
  let out = scratch("failed");
  let target = out.join("taken");
  fs::create_dir_all(target.join("inside")).unwrap();

  let err = writer::write_atomic(&target, b"{}").unwrap_err();
  assert!(err.to_string().contains("taken"));
  let names: Vec<String> = fs::read_dir(&out)
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  assert_eq!(names, vec!["taken"]);

  fs::remove_dir_all(&out).unwrap();
}
