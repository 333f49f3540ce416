//! Static JSON emitter.
//!
//! Walks the ranked tables of an [`SqliteStore`] and writes the site's data
//! tree under `<out>/api`:
//!
//! - `season/{id}/…`: run leaderboards and player leaderboards;
//! - `player/{region}/{realm}/{name}.json`: one page per ranked player;
//! - `search/players-NNN.json`: the search index shards.
//!
//! Producers build pages and hand them to a pool of writer tasks through a
//! bounded queue. Every file is written atomically.

use std::{
  collections::HashMap,
  path::PathBuf,
  time::{Duration, Instant},
};

use ookstats_core::{model::DungeonInfo, wow::DEFAULT_REGIONS};
use ookstats_store_sqlite::SqliteStore;

pub mod error;
mod leaderboards;
pub mod pages;
pub mod pagination;
mod player_leaderboards;
pub mod players;
mod queue;
pub mod search;
pub mod writer;

pub use error::{Error, Result};
use queue::PageQueue;

pub const DEFAULT_WORKERS: usize = 10;

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EmitOptions {
  /// Site root; pages land under `<out>/api`.
  pub out:          PathBuf,
  pub page_size:    usize,
  pub shard_size:   usize,
  pub workers:      usize,
  /// Regions with regional and realm pages. Empty means all four.
  pub regions:      Vec<String>,
  /// Per-player pages.
  pub players:      bool,
  /// Run and player leaderboards.
  pub leaderboards: bool,
  pub search:       bool,
}

impl Default for EmitOptions {
  fn default() -> Self {
    Self {
      out:          PathBuf::from("public"),
      page_size:    pagination::DEFAULT_PAGE_SIZE,
      shard_size:   search::DEFAULT_SHARD_SIZE,
      workers:      DEFAULT_WORKERS,
      regions:      Vec::new(),
      players:      true,
      leaderboards: true,
      search:       true,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct EmitSummary {
  pub seasons:                  usize,
  pub leaderboard_pages:        usize,
  pub player_leaderboard_pages: usize,
  pub player_pages:             usize,
  pub search_shards:            usize,
  /// Files the writer pool wrote.
  pub written:                  usize,
  pub duration:                 Duration,
}

// ─── Emitter ─────────────────────────────────────────────────────────────────

/// Shared state of one emit run.
pub(crate) struct Emitter<'a> {
  pub(crate) store:        &'a SqliteStore,
  pub(crate) options:      &'a EmitOptions,
  pub(crate) queue:        &'a PageQueue,
  pub(crate) api:          PathBuf,
  pub(crate) page_size:    usize,
  pub(crate) regions:      Vec<String>,
  pub(crate) dungeons:     HashMap<i64, DungeonInfo>,
  realm_names:             HashMap<(String, String), String>,
  /// Data timestamp stamped on pages, so unchanged data gives unchanged files.
  pub(crate) generated_at: i64,
}

impl<'a> Emitter<'a> {
  async fn load(
    store: &'a SqliteStore,
    options: &'a EmitOptions,
    queue: &'a PageQueue,
  ) -> Result<Self> {
    let dungeons = store.load_dungeons().await?.into_iter().map(|d| (d.id, d)).collect();
    let realm_names = store
      .load_realms()
      .await?
      .into_iter()
      .map(|r| ((r.region, r.slug), r.name))
      .collect();
    let regions = if options.regions.is_empty() {
      DEFAULT_REGIONS.iter().map(|r| (*r).to_owned()).collect()
    } else {
      options.regions.iter().map(|r| r.trim().to_lowercase()).collect()
    };
    Ok(Self {
      store,
      options,
      queue,
      api: options.out.join("api"),
      page_size: options.page_size.max(1),
      regions,
      dungeons,
      realm_names,
      generated_at: store.profiles_updated_at().await?,
    })
  }

  pub(crate) fn wants_region(&self, region: &str) -> bool {
    self.regions.iter().any(|r| r == region)
  }

  /// Display name of a realm, or its slug when unknown.
  pub(crate) fn realm_name(&self, region: &str, slug: &str) -> String {
    self
      .realm_names
      .get(&(region.to_owned(), slug.to_owned()))
      .filter(|n| !n.is_empty())
      .cloned()
      .unwrap_or_else(|| slug.to_owned())
  }
}

/// Write the whole tree.
pub async fn emit(store: &SqliteStore, options: &EmitOptions) -> Result<EmitSummary> {
  let started = Instant::now();
  let queue = PageQueue::start(options.workers);
  let produced = produce(store, options, &queue).await;
  let written = queue.finish().await;

  let mut summary = match (produced, written) {
    (Ok(summary), Ok(written)) => EmitSummary { written, ..summary },
    (Err(Error::QueueClosed), Err(e)) | (Err(e), _) | (Ok(_), Err(e)) => return Err(e),
  };
  summary.duration = started.elapsed();
  tracing::info!(
    seasons = summary.seasons,
    leaderboard_pages = summary.leaderboard_pages,
    player_leaderboard_pages = summary.player_leaderboard_pages,
    player_pages = summary.player_pages,
    search_shards = summary.search_shards,
    written = summary.written,
    elapsed_ms = summary.duration.as_millis() as u64,
    out = %options.out.display(),
    "static site generated"
  );
  Ok(summary)
}

async fn produce(
  store: &SqliteStore,
  options: &EmitOptions,
  queue: &PageQueue,
) -> Result<EmitSummary> {
  let ctx = Emitter::load(store, options, queue).await?;
  let mut summary = EmitSummary::default();

  if options.leaderboards {
    let seasons = store.ranked_seasons().await?;
    if seasons.is_empty() {
      tracing::warn!("no ranked seasons; skipping leaderboards");
    }
    summary.seasons = seasons.len();
    for season_id in seasons {
      summary.leaderboard_pages += leaderboards::emit_season(&ctx, season_id).await?;
      summary.player_leaderboard_pages += player_leaderboards::emit_season(&ctx, season_id).await?;
    }
  }
  if options.players {
    summary.player_pages = players::emit_all(&ctx).await?;
  }
  if options.search {
    summary.search_shards = search::emit_shards(&ctx).await?;
  }
  Ok(summary)
}

#[cfg(test)]
mod tests;
