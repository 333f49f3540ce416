//! Pipeline stages against an in-memory store and a scripted vendor.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use ookstats_blizzard::{CharacterStatus, Error as ApiError, FetchOutcome, FetchResult, SeasonIndex};
use ookstats_core::{
  identity::{AchievementRecord, Milestones, fingerprint_hash},
  model::{
    CharacterProfile, CharacterSummary, DungeonInfo, Leaderboard, LeaderboardMember,
    LeaderboardRun, ProfileCandidate, RealmInfo, SeasonRecord,
  },
  store::RunStore,
};
use ookstats_store_sqlite::SqliteStore;
use tokio_util::sync::CancellationToken;

use crate::{
  AppConfig, VendorApi,
  fetch::{Batcher, select_dungeons, select_realms},
  identity::{IdentityEngine, IdentityOptions, release_claim},
  profiles::{ProfileOutcome, fetch_profiles, refresh_profile},
  seasons::sync_seasons,
};

const SEASON_START: i64 = 1_690_000_000_000;
const T0: i64 = 1_700_000_000_000;

// ─── Scripted vendor ─────────────────────────────────────────────────────────

#[derive(Clone)]
enum Reply<T> {
  Ok(T),
  Fail(u16),
}

/// What the vendor knows about one character. `None` answers 404.
#[derive(Clone, Default)]
struct Character {
  status:       Option<Reply<CharacterStatus>>,
  achievements: Option<Reply<Vec<AchievementRecord>>>,
  profile:      Option<Reply<CharacterProfile>>,
}

#[derive(Clone, Default)]
struct FakeVendor {
  characters: Arc<HashMap<String, Character>>,
  seasons:    Arc<HashMap<String, Vec<SeasonRecord>>>,
  calls:      Arc<Mutex<Vec<String>>>,
}

impl FakeVendor {
  fn with_characters(characters: Vec<(&str, &str, Character)>) -> Self {
    let characters = characters
      .into_iter()
      .map(|(realm, name, c)| (key(realm, name), c))
      .collect();
    Self { characters: Arc::new(characters), ..Self::default() }
  }

  fn calls(&self, kind: &str) -> Vec<String> {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter_map(|c| c.strip_prefix(kind).map(|rest| rest.trim().to_owned()))
      .collect()
  }

  fn character(&self, kind: &str, name: &str, realm_slug: &str) -> Option<&Character> {
    self.calls.lock().unwrap().push(format!("{kind} {}", key(realm_slug, name)));
    self.characters.get(&key(realm_slug, name))
  }
}

fn key(realm: &str, name: &str) -> String {
  format!("{realm}/{}", name.to_lowercase())
}

fn api_error(status: u16) -> ApiError {
  ApiError::Api { status, body: String::new(), retry_after: None }
}

fn answer<T: Clone>(reply: Option<&Reply<T>>) -> Result<T, ApiError> {
  match reply {
    Some(Reply::Ok(v)) => Ok(v.clone()),
    Some(Reply::Fail(status)) => Err(api_error(*status)),
    None => Err(api_error(404)),
  }
}

impl VendorApi for FakeVendor {
  async fn status(
    &self,
    name: &str,
    realm_slug: &str,
    _region: &str,
  ) -> Result<CharacterStatus, ApiError> {
    answer(self.character("status", name, realm_slug).and_then(|c| c.status.as_ref()))
  }

  async fn achievements(
    &self,
    name: &str,
    realm_slug: &str,
    _region: &str,
  ) -> Result<Vec<AchievementRecord>, ApiError> {
    answer(
      self
        .character("achievements", name, realm_slug)
        .and_then(|c| c.achievements.as_ref()),
    )
  }

  async fn profile(
    &self,
    name: &str,
    realm_slug: &str,
    _region: &str,
  ) -> Result<CharacterProfile, ApiError> {
    answer(self.character("profile", name, realm_slug).and_then(|c| c.profile.as_ref()))
  }

  async fn season_index(&self, region: &str) -> Result<SeasonIndex, ApiError> {
    let seasons = self.seasons.get(region).ok_or_else(|| api_error(503))?;
    Ok(SeasonIndex {
      season_ids: seasons.iter().map(|s| s.season_number).collect(),
      current:    seasons.last().map(|s| s.season_number),
    })
  }

  async fn season_detail(&self, region: &str, season_id: i64) -> Result<SeasonRecord, ApiError> {
    self
      .seasons
      .get(region)
      .and_then(|all| all.iter().find(|s| s.season_number == season_id))
      .cloned()
      .ok_or_else(|| api_error(404))
  }
}

fn valid() -> Reply<CharacterStatus> {
  Reply::Ok(CharacterStatus {
    is_valid:     true,
    reason:       None,
    character_id: None,
    name:         None,
    realm_slug:   None,
  })
}

fn achievements(level85: i64, level90: i64, heroic: i64) -> Reply<Vec<AchievementRecord>> {
  let done = |id, ts| AchievementRecord {
    id,
    completed_timestamp: Some(ts),
    criteria_completed: true,
  };
  Reply::Ok(vec![done(4826, level85), done(6193, level90), done(6456, heroic)])
}

fn profile() -> CharacterProfile {
  CharacterProfile {
    summary: CharacterSummary {
      class_id: 1,
      class_name: "Warrior".into(),
      active_spec_id: 71,
      active_spec_name: "Arms".into(),
      level: 90,
      ..CharacterSummary::default()
    },
    equipment: Vec::new(),
    avatar_url: Some("https://example.test/avatar.jpg".into()),
  }
}

// ─── Store fixtures ──────────────────────────────────────────────────────────

fn pagle() -> RealmInfo {
  RealmInfo {
    id:                10,
    name:              "Pagle".into(),
    region:            "us".into(),
    slug:              "pagle".into(),
    parent_realm_slug: None,
  }
}

fn nazgrim() -> RealmInfo {
  RealmInfo {
    id:                11,
    name:              "Nazgrim".into(),
    region:            "us".into(),
    slug:              "nazgrim".into(),
    parent_realm_slug: Some("pagle".into()),
  }
}

fn dungeon(id: i64) -> DungeonInfo {
  DungeonInfo { id, name: format!("Dungeon {id}"), slug: format!("dungeon-{id}") }
}

/// A store with pagle and nazgrim, two dungeons and, when `season` is set,
/// an open season 5 in `us`. The raw connection is returned for assertions.
async fn store(season: bool) -> (SqliteStore, tokio_rusqlite::Connection) {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let store = SqliteStore::from_connection(conn.clone()).await.unwrap();
  store
    .ensure_reference_data(vec![pagle(), nazgrim()], vec![dungeon(1), dungeon(2)])
    .await
    .unwrap();
  if season {
    store
      .sync_season(SeasonRecord {
        season_number:   5,
        region:          "us".into(),
        season_name:     "Season 5".into(),
        start_timestamp: SEASON_START,
        period_ids:      (1020..=1025).collect(),
      })
      .await
      .unwrap();
  }
  (store, conn)
}

async fn scalar(conn: &tokio_rusqlite::Connection, sql: &'static str) -> i64 {
  conn
    .call(move |c| Ok(c.query_row(sql, [], |r| r.get::<_, i64>(0))?))
    .await
    .unwrap()
}

fn run(duration: i64, ts: i64, members: &[(i64, Option<i64>)]) -> LeaderboardRun {
  LeaderboardRun {
    duration,
    completed_timestamp: ts,
    keystone_level: 1,
    members: members
      .iter()
      .map(|(id, spec)| LeaderboardMember {
        id:         Some(*id),
        name:       format!("P{id}"),
        realm_slug: None,
        spec_id:    *spec,
        faction:    Some("HORDE".into()),
      })
      .collect(),
  }
}

fn board(realm: RealmInfo, dungeon_id: i64, period: i64, runs: Vec<LeaderboardRun>) -> FetchResult {
  FetchResult {
    realm,
    dungeon: dungeon(dungeon_id),
    period,
    outcome: FetchOutcome::Leaderboard(Leaderboard {
      period,
      period_start_timestamp: T0 - 1_000,
      period_end_timestamp: T0 + 1_000_000,
      runs,
    }),
  }
}

fn failure(realm: RealmInfo, dungeon_id: i64, period: i64, status: u16) -> FetchResult {
  FetchResult {
    realm,
    dungeon: dungeon(dungeon_id),
    period,
    outcome: FetchOutcome::Error {
      kind:    if status == 0 { "transport" } else { "api" },
      status,
      message: format!("status {status}"),
    },
  }
}

async fn ingest(store: &SqliteStore, results: Vec<FetchResult>) {
  let mut batcher = Batcher::new(store, 10, false);
  for result in results {
    batcher.push(result).await;
  }
  let totals = batcher.finish().await;
  assert_eq!(totals.failed_batches, 0);
}

// ─── Batcher ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batcher_records_every_outcome() {
  let (store, conn) = store(true).await;
  let mut batcher = Batcher::new(&store, 2, true);
  for result in [
    board(pagle(), 1, 1020, vec![run(300_000, T0, &[(1, Some(71))])]),
    board(pagle(), 2, 1020, Vec::new()),
    failure(nazgrim(), 1, 1020, 404),
    failure(nazgrim(), 2, 1020, 503),
    failure(pagle(), 3, 1020, 0),
    failure(pagle(), 1, 0, 500),
  ] {
    batcher.push(result).await;
  }
  let totals = batcher.finish().await;

  assert_eq!(totals.results, 6);
  assert_eq!(totals.not_found, 1);
  assert_eq!(totals.fetch_errors, 3);
  assert_eq!(totals.failed_batches, 0);
  assert_eq!(totals.ingest.runs_inserted, 1);

  let rows = conn
    .call(|c| {
      let mut stmt = c.prepare(
        "SELECT realm_slug, dungeon_id, status, http_status, message
         FROM fetch_status ORDER BY realm_slug, dungeon_id",
      )?;
      let rows = stmt.query_map([], |r| {
        Ok((
          r.get::<_, String>(0)?,
          r.get::<_, i64>(1)?,
          r.get::<_, String>(2)?,
          r.get::<_, Option<i64>>(3)?,
          r.get::<_, Option<String>>(4)?,
        ))
      })?;
      Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    })
    .await
    .unwrap();

  let expected = vec![
    ("nazgrim".to_owned(), 1, "missing".to_owned(), Some(404), Some("status 404".to_owned())),
    ("nazgrim".to_owned(), 2, "error".to_owned(), Some(503), Some("status 503".to_owned())),
    ("pagle".to_owned(), 1, "ok".to_owned(), Some(200), None),
    ("pagle".to_owned(), 2, "ok".to_owned(), Some(200), Some("no runs returned".to_owned())),
    ("pagle".to_owned(), 3, "error".to_owned(), None, Some("status 0".to_owned())),
  ];
  assert_eq!(rows, expected);
}

#[tokio::test]
async fn batcher_skips_replayed_leaderboards() {
  let (store, conn) = store(true).await;
  let payload = || board(pagle(), 1, 1020, vec![run(300_000, T0, &[(1, Some(71)), (2, Some(72))])]);

  ingest(&store, vec![payload()]).await;
  let mut batcher = Batcher::new(&store, 10, false);
  batcher.push(payload()).await;
  let totals = batcher.finish().await;

  assert_eq!(totals.ingest.runs_inserted, 0);
  assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM challenge_runs").await, 1);
  assert_eq!(
    scalar(
      &conn,
      "SELECT last_completed_ts FROM api_fetch_markers
       WHERE realm_slug = 'pagle' AND dungeon_id = 1 AND period_id = 1020"
    )
    .await,
    T0
  );
}

// ─── Sweep selection ─────────────────────────────────────────────────────────

#[test]
fn sweep_filters_realms_and_dungeons() {
  let config = AppConfig {
    regions: vec!["us".into()],
    realms: vec!["Pagle".into(), "nazgrim".into()],
    dungeons: vec!["2".into(), "mogu-shan-palace".into()],
    ..AppConfig::default()
  };
  let realms = select_realms(&config);
  let slugs: Vec<&str> = realms.iter().map(|r| r.slug.as_str()).collect();
  assert_eq!(slugs.len(), 2);
  assert!(slugs.contains(&"pagle") && slugs.contains(&"nazgrim"));

  let dungeons = select_dungeons(&config);
  assert!(dungeons.iter().any(|d| d.slug == "mogu-shan-palace"));
  assert!(dungeons.iter().any(|d| d.id == 2));

  let everything = AppConfig::default();
  assert_eq!(select_dungeons(&everything).len(), ookstats_core::wow::DUNGEONS.len());
  assert!(select_realms(&everything).iter().any(|r| r.region == "eu"));
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fingerprint_collision_moves_history_to_new_player() {
  let (store, conn) = store(true).await;
  let a_runs = (1020..=1024)
    .map(|period| board(pagle(), 1, period, vec![run(300_000, T0 + period, &[(100, Some(71))])]))
    .collect();
  ingest(&store, a_runs).await;

  let vendor = FakeVendor::with_characters(vec![
    ("pagle", "P100", Character {
      status: Some(valid()),
      achievements: Some(achievements(1_000, 2_000, 3_000)),
      ..Character::default()
    }),
    ("pagle", "P200", Character {
      status: Some(valid()),
      achievements: Some(achievements(1_000, 2_000, 3_000)),
      ..Character::default()
    }),
  ]);
  let hash = fingerprint_hash(1, &Milestones { level85: 1_000, level90: 2_000, earliest_heroic: 3_000 });

  let first = IdentityEngine::load(store.clone(), vendor.clone(), IdentityOptions::default())
    .await
    .unwrap();
  let stats = first.run().await.unwrap();
  assert_eq!((stats.candidates, stats.created), (1, 1));
  assert_eq!(first.owner_of(&hash).await, Some(100));

  // The same character shows up under a new id.
  ingest(&store, vec![board(pagle(), 2, 1024, vec![run(280_000, T0 + 5_000, &[(200, Some(71))])])])
    .await;

  let second = IdentityEngine::load(store.clone(), vendor, IdentityOptions::default())
    .await
    .unwrap();
  let stats = second.run().await.unwrap();
  assert_eq!((stats.candidates, stats.merged, stats.errors), (1, 1, 0));
  assert_eq!(second.owner_of(&hash).await, Some(200));

  assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM run_members WHERE player_id = 100").await, 0);
  assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM run_members WHERE player_id = 200").await, 6);
  assert_eq!(scalar(&conn, "SELECT is_valid FROM players WHERE id = 100").await, 0);
  assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM player_fingerprints").await, 1);
  assert_eq!(scalar(&conn, "SELECT player_id FROM player_fingerprints").await, 200);
}

#[tokio::test]
async fn identity_outcomes_follow_vendor_answers() {
  let (store, conn) = store(true).await;
  ingest(&store, vec![board(pagle(), 1, 1020, vec![
    run(300_000, T0, &[(1, Some(71)), (2, Some(71)), (3, Some(71))]),
    run(310_000, T0 + 1, &[(4, Some(71)), (5, Some(71)), (6, None)]),
  ])])
  .await;

  let renamed = CharacterStatus {
    is_valid:     true,
    reason:       None,
    character_id: Some(9005),
    name:         Some("Renamed".into()),
    realm_slug:   Some("pagle".into()),
  };
  let vendor = FakeVendor::with_characters(vec![
    // P1 is unknown to the vendor.
    ("pagle", "P2", Character {
      status: Some(Reply::Ok(CharacterStatus {
        is_valid: false,
        reason: Some("transferred".into()),
        ..renamed.clone()
      })),
      ..Character::default()
    }),
    ("pagle", "P3", Character { status: Some(Reply::Fail(503)), ..Character::default() }),
    ("pagle", "P4", Character {
      status: Some(valid()),
      achievements: Some(Reply::Ok(vec![AchievementRecord {
        id: 4826,
        completed_timestamp: Some(1_000),
        criteria_completed: true,
      }])),
      ..Character::default()
    }),
    ("pagle", "P5", Character { status: Some(Reply::Ok(renamed)), ..Character::default() }),
    ("pagle", "Renamed", Character {
      achievements: Some(achievements(1_000, 2_000, 3_000)),
      ..Character::default()
    }),
  ]);

  let engine = IdentityEngine::load(store.clone(), vendor.clone(), IdentityOptions {
    batch_size:  2,
    max_players: None,
  })
  .await
  .unwrap();
  let stats = engine.run().await.unwrap();

  assert_eq!(stats.candidates, 6);
  assert_eq!(stats.created, 1);
  assert_eq!(stats.invalid, 4);
  assert_eq!(stats.skipped, 1);
  assert_eq!(stats.errors, 0);

  assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM players WHERE is_valid = 0").await, 4);
  assert_eq!(scalar(&conn, "SELECT is_valid FROM players WHERE id = 3").await, 1);
  assert_eq!(scalar(&conn, "SELECT blizzard_character_id FROM players WHERE id = 5").await, 9005);
  assert_eq!(scalar(&conn, "SELECT is_valid FROM players WHERE id = 5").await, 1);
  assert_eq!(
    scalar(&conn, "SELECT COUNT(*) FROM players WHERE id = 5 AND status_checked_at IS NOT NULL")
      .await,
    1
  );
  // The class-less player never reaches the vendor.
  assert!(!vendor.calls("status").iter().any(|c| c == "pagle/p6"));
  // Achievements follow the name the status endpoint reported.
  let mut achievement_calls = vendor.calls("achievements");
  achievement_calls.sort();
  assert_eq!(achievement_calls, vec!["pagle/p4", "pagle/renamed"]);
  let last_seen = conn
    .call(|c| {
      Ok(c.query_row(
        "SELECT last_seen_name FROM player_fingerprints WHERE player_id = 5",
        [],
        |r| r.get::<_, String>(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(last_seen, "Renamed");

  // A second pass has nothing left but the skipped player.
  let again = IdentityEngine::load(store, vendor, IdentityOptions::default()).await.unwrap();
  assert_eq!(again.run().await.unwrap().candidates, 1);
}

#[tokio::test]
async fn failed_fingerprint_save_releases_the_claim() {
  let (store, conn) = store(true).await;
  ingest(&store, vec![board(pagle(), 1, 1020, vec![run(300_000, T0, &[(1, Some(71))])])]).await;
  let vendor = FakeVendor::with_characters(vec![("pagle", "P1", Character {
    status: Some(valid()),
    achievements: Some(achievements(1_000, 2_000, 3_000)),
    ..Character::default()
  })]);
  let hash = fingerprint_hash(1, &Milestones { level85: 1_000, level90: 2_000, earliest_heroic: 3_000 });

  let engine = IdentityEngine::load(store.clone(), vendor, IdentityOptions::default())
    .await
    .unwrap();
  conn
    .call(|c| {
      Ok(c.execute_batch(
        "CREATE TRIGGER reject_fingerprints BEFORE INSERT ON player_fingerprints
         BEGIN SELECT RAISE(ABORT, 'rejected'); END",
      )?)
    })
    .await
    .unwrap();

  let stats = engine.run().await.unwrap();
  assert_eq!((stats.created, stats.errors), (0, 1));
  assert_eq!(engine.owner_of(&hash).await, None);
  // Validity is written with the fingerprint, so nothing was recorded.
  assert_eq!(
    scalar(&conn, "SELECT COUNT(*) FROM players WHERE status_checked_at IS NOT NULL").await,
    0
  );
}

#[test]
fn released_claim_respects_later_owner() {
  let mut owners = HashMap::from([("h".to_owned(), 7)]);
  release_claim(&mut owners, "h".into(), 7, Some(3));
  assert_eq!(owners.get("h"), Some(&3));

  release_claim(&mut owners, "h".into(), 7, None);
  assert_eq!(owners.get("h"), Some(&3));

  owners.insert("g".into(), 9);
  release_claim(&mut owners, "g".into(), 9, None);
  assert!(!owners.contains_key("g"));
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// P1 on pagle and P2 on nazgrim complete both dungeons of season 5.
async fn ranked_pool() -> (SqliteStore, tokio_rusqlite::Connection) {
  let (store, conn) = store(true).await;
  ingest(&store, vec![
    board(pagle(), 1, 1020, vec![run(100_000, T0, &[(1, Some(71))])]),
    board(pagle(), 2, 1020, vec![run(200_000, T0, &[(1, Some(71))])]),
    board(nazgrim(), 1, 1020, vec![run(110_000, T0, &[(2, Some(71))])]),
    board(nazgrim(), 2, 1020, vec![run(210_000, T0, &[(2, Some(71))])]),
  ])
  .await;
  store.rebuild_rankings().await.unwrap();
  (store, conn)
}

#[tokio::test]
async fn profiles_fall_back_to_pool_realms() {
  let (store, conn) = ranked_pool().await;
  let vendor = FakeVendor::with_characters(vec![
    ("pagle", "P1", Character { profile: Some(Reply::Fail(503)), ..Character::default() }),
    ("pagle", "P2", Character { profile: Some(Reply::Ok(profile())), ..Character::default() }),
  ]);

  let summary = fetch_profiles(&store, &vendor, &AppConfig::default(), &CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(summary.candidates, 2);
  assert_eq!(summary.profiles, 1);
  assert_eq!(summary.errors, 1);
  assert_eq!(summary.not_found, 0);
  assert!(!summary.cancelled);

  let p2_calls: Vec<String> = vendor
    .calls("profile")
    .into_iter()
    .filter(|c| c.ends_with("/p2"))
    .collect();
  assert_eq!(p2_calls, vec!["nazgrim/p2", "pagle/p2"]);
  assert_eq!(scalar(&conn, "SELECT player_id FROM player_details").await, 2);

  // P2 is now fresh; only P1 is left.
  let again = fetch_profiles(&store, &vendor, &AppConfig::default(), &CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(again.candidates, 1);
}

#[tokio::test]
async fn unknown_character_tries_each_realm_once() {
  let (store, _conn) = ranked_pool().await;
  let vendor = FakeVendor::default();
  let candidate = ProfileCandidate {
    player_id:  1,
    name:       "P1".into(),
    region:     "us".into(),
    realm_slug: "pagle".into(),
  };

  let outcome = refresh_profile(&store, &vendor, candidate, T0).await.unwrap();
  assert_eq!(outcome, ProfileOutcome::NotFound);

  let calls = vendor.calls("profile");
  assert_eq!(calls[0], "pagle/p1");
  assert!(calls.contains(&"nazgrim/p1".to_owned()));
  let mut unique = calls.clone();
  unique.sort();
  unique.dedup();
  assert_eq!(unique.len(), calls.len());
}

#[tokio::test]
async fn cancelled_profile_pass_fetches_nothing() {
  let (store, _conn) = ranked_pool().await;
  let vendor = FakeVendor::default();
  let cancel = CancellationToken::new();
  cancel.cancel();

  let summary = fetch_profiles(&store, &vendor, &AppConfig::default(), &cancel).await.unwrap();
  assert!(summary.cancelled);
  assert_eq!(summary.processed, 0);
  assert!(vendor.calls("profile").is_empty());
}

// ─── Seasons ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn seasons_sync_closes_windows_and_assigns_runs() {
  let (store, conn) = store(false).await;
  ingest(&store, vec![board(pagle(), 1, 1030, vec![run(300_000, T0, &[(1, Some(71))])])]).await;
  assert_eq!(
    scalar(&conn, "SELECT COUNT(*) FROM challenge_runs WHERE season_id IS NULL").await,
    1
  );

  let second_start = T0 - 1_000_000;
  let vendor = FakeVendor {
    seasons: Arc::new(HashMap::from([(
      "us".to_owned(),
      vec![
        SeasonRecord {
          season_number:   1,
          region:          "us".into(),
          season_name:     "Season 1".into(),
          start_timestamp: SEASON_START,
          period_ids:      vec![1020, 1021],
        },
        SeasonRecord {
          season_number:   2,
          region:          "us".into(),
          season_name:     "Season 2".into(),
          start_timestamp: second_start,
          period_ids:      vec![1030],
        },
      ],
    )])),
    ..FakeVendor::default()
  };

  let summary = sync_seasons(&store, &vendor, &["us".to_owned(), "kr".to_owned()])
    .await
    .unwrap();
  assert_eq!(summary.seasons, 2);
  assert_eq!(summary.errors, 1);
  assert_eq!(summary.runs_assigned, 1);

  assert_eq!(
    scalar(&conn, "SELECT end_timestamp FROM seasons WHERE season_number = 1").await,
    second_start
  );
  assert_eq!(scalar(&conn, "SELECT season_id FROM challenge_runs").await, 2);
}
