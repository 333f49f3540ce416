//! The Challenge Mode sweep: fetch every selected leaderboard for every
//! period and persist it in batches.

use std::{
  collections::BTreeMap,
  time::{Duration, Instant},
};

use ookstats_blizzard::{BlizzardClient, FetchOutcome, FetchResult, fetch_all_realms};
use ookstats_core::{
  model::{
    DungeonInfo, FetchMetadata, FetchStatus, FetchStatusRecord, IngestStats,
    LeaderboardBatchItem, RealmInfo,
  },
  now_millis,
  store::RunStore,
  wow,
};
use tokio_util::sync::CancellationToken;

use crate::{AppConfig, Error, Result, deadline_token};

pub const FETCH_TYPE: &str = "challenge_mode_leaderboard";

// ─── Batcher ─────────────────────────────────────────────────────────────────

/// Running totals of a [`Batcher`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchTotals {
  /// Fetch results seen, of any outcome.
  pub results:        usize,
  pub not_found:      usize,
  pub fetch_errors:   usize,
  /// Ingestion transactions that failed and were rolled back.
  pub failed_batches: usize,
  pub ingest:         IngestStats,
}

/// Drains fetch results into the store, `batch_size` leaderboards per
/// transaction.
///
/// Every result first has its outcome recorded in `fetch_status`. Failed
/// results are logged and dropped. A batch that fails to persist is logged
/// and counted; later batches still run.
pub struct Batcher<'a, S> {
  store:      &'a S,
  batch_size: usize,
  verbose:    bool,
  pending:    Vec<LeaderboardBatchItem>,
  batches:    usize,
  totals:     BatchTotals,
}

impl<'a, S: RunStore> Batcher<'a, S> {
  pub fn new(store: &'a S, batch_size: usize, verbose: bool) -> Self {
    let batch_size = batch_size.max(1);
    Self {
      store,
      batch_size,
      verbose,
      pending: Vec::with_capacity(batch_size),
      batches: 0,
      totals: BatchTotals::default(),
    }
  }

  pub fn totals(&self) -> &BatchTotals {
    &self.totals
  }

  pub async fn push(&mut self, result: FetchResult) {
    self.totals.results += 1;
    self.record_status(&result).await;

    let FetchResult { realm, dungeon, period, outcome } = result;
    match outcome {
      FetchOutcome::Leaderboard(leaderboard) => {
        self.pending.push(LeaderboardBatchItem {
          region: realm.region,
          realm_slug: realm.slug,
          dungeon,
          period_id: period,
          leaderboard,
        });
        if self.pending.len() >= self.batch_size {
          self.flush().await;
        }
      }
      FetchOutcome::Error { status: 404, .. } => {
        self.totals.not_found += 1;
        if self.verbose {
          tracing::info!(
            region = %realm.region,
            realm = %realm.slug,
            dungeon = %dungeon.slug,
            period,
            "leaderboard not found"
          );
        }
      }
      FetchOutcome::Error { kind, status, message } => {
        self.totals.fetch_errors += 1;
        tracing::warn!(
          region = %realm.region,
          realm = %realm.slug,
          dungeon = %dungeon.slug,
          period,
          kind,
          status,
          %message,
          "leaderboard fetch failed"
        );
      }
    }
  }

  /// Persist what is left and return the totals.
  pub async fn finish(mut self) -> BatchTotals {
    self.flush().await;
    self.totals
  }

  async fn flush(&mut self) {
    if self.pending.is_empty() {
      return;
    }
    let items = std::mem::take(&mut self.pending);
    let count = items.len();
    self.batches += 1;

    match self.store.ingest_batch(items).await {
      Ok(stats) => {
        tracing::info!(
          batch = self.batches,
          items = count,
          processed = stats.processed,
          skipped = stats.skipped,
          runs = stats.runs_inserted,
          players = stats.players_inserted,
          conflicts = stats.identity_conflicts,
          "batch persisted"
        );
        self.totals.ingest += stats;
      }
      Err(e) => {
        self.totals.failed_batches += 1;
        self.totals.ingest.errors += count;
        tracing::error!(batch = self.batches, items = count, error = %e, "batch rolled back");
      }
    }
  }

  async fn record_status(&self, result: &FetchResult) {
    if result.period == 0 {
      return;
    }
    let (status, http_status, message) = match &result.outcome {
      FetchOutcome::Leaderboard(lb) => (
        FetchStatus::Ok,
        Some(200),
        lb.runs.is_empty().then_some("no runs returned"),
      ),
      FetchOutcome::Error { status: 404, message, .. } => {
        (FetchStatus::Missing, Some(404), Some(message.as_str()))
      }
      FetchOutcome::Error { status, message, .. } => (
        FetchStatus::Error,
        Some(*status).filter(|s| *s > 0),
        Some(message.as_str()),
      ),
    };
    let record = FetchStatusRecord::new(
      result.realm.region.as_str(),
      result.realm.slug.as_str(),
      result.dungeon.id,
      result.period,
      status,
      http_status,
      message,
      now_millis(),
    );
    if let Err(e) = self.store.record_fetch_status(record).await {
      tracing::warn!(
        realm = %result.realm.slug,
        dungeon = result.dungeon.id,
        period = result.period,
        error = %e,
        "failed to record fetch status"
      );
    }
  }
}

// ─── Sweep ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
  pub regions:   usize,
  pub periods:   usize,
  pub totals:    BatchTotals,
  /// The deadline or the caller cut the sweep short.
  pub cancelled: bool,
  pub duration:  Duration,
}

/// Realms of the static table that pass the region and slug filters.
pub fn select_realms(config: &AppConfig) -> Vec<RealmInfo> {
  let regions = config.region_list();
  wow::realms()
    .into_iter()
    .filter(|r| regions.contains(&r.region))
    .filter(|r| {
      config.realms.is_empty()
        || config.realms.iter().any(|s| s.trim().eq_ignore_ascii_case(&r.slug))
    })
    .collect()
}

/// Dungeons of the static table whose id or slug is listed.
pub fn select_dungeons(config: &AppConfig) -> Vec<DungeonInfo> {
  wow::dungeons()
    .into_iter()
    .filter(|d| {
      config.dungeons.is_empty()
        || config.dungeons.iter().map(|f| f.trim()).any(|f| {
          f.eq_ignore_ascii_case(&d.slug) || f.parse::<i64>().is_ok_and(|id| id == d.id)
        })
    })
    .collect()
}

/// Fetch and persist every selected leaderboard, region by region and
/// period by period, newest period first.
///
/// The sweep stops scheduling requests when `cancel` fires or the configured
/// deadline passes; whatever was fetched by then is still persisted.
pub async fn fetch_challenge_mode<S: RunStore>(
  store: &S,
  client: &BlizzardClient,
  config: &AppConfig,
  cancel: &CancellationToken,
) -> Result<SweepSummary> {
  let started = Instant::now();

  store
    .ensure_reference_data(wow::realms(), wow::dungeons())
    .await
    .map_err(Error::store)?;

  let realms = select_realms(config);
  if realms.is_empty() {
    return Err(Error::NoRealms);
  }
  let dungeons = select_dungeons(config);
  if dungeons.is_empty() {
    return Err(Error::NoDungeons);
  }

  let mut by_region: BTreeMap<String, Vec<RealmInfo>> = BTreeMap::new();
  for realm in realms {
    by_region.entry(realm.region.clone()).or_default().push(realm);
  }
  let configured = config.period_ids()?;

  let token = deadline_token(cancel, config.fetch_deadline());
  let mut batcher = Batcher::new(store, config.batch_size, config.verbose);
  let mut summary = SweepSummary { regions: by_region.len(), ..SweepSummary::default() };

  tracing::info!(
    regions = by_region.len(),
    dungeons = dungeons.len(),
    concurrency = client.config().concurrency,
    "starting challenge mode sweep"
  );

  'regions: for (region, realms) in &by_region {
    let periods = if configured.is_empty() {
      periods_for(client, region).await
    } else {
      configured.clone()
    };
    tracing::info!(%region, realms = realms.len(), periods = periods.len(), "sweeping region");

    for period in periods {
      if token.is_cancelled() {
        break 'regions;
      }
      let mut stream = fetch_all_realms(
        client,
        realms.clone(),
        dungeons.clone(),
        period,
        token.clone(),
      );
      let expected = stream.expected();
      let mut received = 0usize;
      while let Some(result) = stream.next().await {
        received += 1;
        batcher.push(result).await;
      }
      summary.periods += 1;
      tracing::info!(
        %region,
        period,
        received,
        expected,
        runs = batcher.totals().ingest.runs_inserted,
        "period complete"
      );
    }
  }

  summary.cancelled = token.is_cancelled();
  token.cancel();
  summary.totals = batcher.finish().await;
  summary.duration = started.elapsed();

  let metadata = FetchMetadata {
    fetch_type:      FETCH_TYPE.to_owned(),
    timestamp:       now_millis(),
    runs_fetched:    i64::try_from(summary.totals.ingest.runs_inserted).unwrap_or(i64::MAX),
    players_fetched: i64::try_from(summary.totals.ingest.players_inserted)
      .unwrap_or(i64::MAX),
  };
  if let Err(e) = store.record_fetch_metadata(metadata).await {
    tracing::warn!(error = %e, "failed to record fetch metadata");
  }

  let stats = client.stats();
  tracing::info!(
    periods = summary.periods,
    results = summary.totals.results,
    not_found = summary.totals.not_found,
    errors = summary.totals.fetch_errors,
    failed_batches = summary.totals.failed_batches,
    runs = summary.totals.ingest.runs_inserted,
    players = summary.totals.ingest.players_inserted,
    requests = stats.requests,
    avg_latency_ms = stats.avg_latency_ms,
    cancelled = summary.cancelled,
    elapsed_s = summary.duration.as_secs(),
    "challenge mode sweep finished"
  );
  Ok(summary)
}

/// The vendor's period index for `region`, or the static fallback list when
/// it is unavailable.
async fn periods_for(client: &BlizzardClient, region: &str) -> Vec<i64> {
  match client.period_index(region).await {
    Ok(ids) if !ids.is_empty() => ids,
    Ok(_) => {
      tracing::warn!(%region, "empty period index; using fallback periods");
      wow::fallback_periods()
    }
    Err(e) => {
      tracing::warn!(%region, error = %e, "period index unavailable; using fallback periods");
      wow::fallback_periods()
    }
  }
}
