//! Season synchronisation from the vendor season index.

use ookstats_core::store::RunStore;

use crate::{Error, Result, VendorApi};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonSyncSummary {
  pub regions:       usize,
  pub seasons:       usize,
  /// Regions or seasons the vendor could not describe.
  pub errors:        usize,
  /// Runs that carry a season after reassignment.
  pub runs_assigned: usize,
}

/// Upsert every season of every region, oldest first so each one closes its
/// predecessor, then reassign stored runs to the updated windows.
///
/// Vendor failures are logged per region or season and skipped. Store
/// failures abort.
pub async fn sync_seasons<S: RunStore, V: VendorApi>(
  store: &S,
  vendor: &V,
  regions: &[String],
) -> Result<SeasonSyncSummary> {
  let mut summary = SeasonSyncSummary { regions: regions.len(), ..Default::default() };

  for region in regions {
    let index = match vendor.season_index(region).await {
      Ok(index) => index,
      Err(e) => {
        summary.errors += 1;
        tracing::warn!(%region, error = %e, "season index unavailable");
        continue;
      }
    };
    tracing::info!(%region, seasons = index.season_ids.len(), current = ?index.current, "syncing seasons");

    for season_id in index.season_ids {
      let record = match vendor.season_detail(region, season_id).await {
        Ok(record) => record,
        Err(e) => {
          summary.errors += 1;
          tracing::warn!(%region, season_id, error = %e, "season detail unavailable");
          continue;
        }
      };
      let periods = record.period_ids.len();
      let row = store.sync_season(record).await.map_err(Error::store)?;
      summary.seasons += 1;
      tracing::debug!(%region, season_id, row, periods, "season synced");
    }
  }

  summary.runs_assigned = store.assign_run_seasons().await.map_err(Error::store)?;
  tracing::info!(
    seasons = summary.seasons,
    errors = summary.errors,
    runs_assigned = summary.runs_assigned,
    "season sync finished"
  );
  Ok(summary)
}
