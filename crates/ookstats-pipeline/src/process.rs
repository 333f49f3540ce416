//! The ranking rebuild stage.

use std::time::Instant;

use ookstats_store_sqlite::{RebuildStats, SqliteStore};

use crate::{Error, Result};

/// Recompute every run ranking and player aggregate.
pub async fn rebuild_rankings(store: &SqliteStore) -> Result<RebuildStats> {
  let started = Instant::now();
  tracing::info!("rebuilding rankings");
  let stats = store.rebuild_rankings().await.map_err(Error::store)?;
  tracing::info!(
    run_rankings = stats.run_rankings,
    best_runs = stats.best_runs,
    profiles = stats.profiles,
    ranked_players = stats.ranked_players,
    computed_at = stats.computed_at,
    elapsed_ms = started.elapsed().as_millis() as u64,
    "rankings rebuilt"
  );
  Ok(stats)
}
