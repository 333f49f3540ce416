//! Bounded fan-out of one period's leaderboard requests.

use std::sync::Arc;

use ookstats_core::model::{DungeonInfo, Leaderboard, RealmInfo};
use tokio::{
  sync::{Semaphore, mpsc},
  task::JoinSet,
};
use tokio_util::sync::CancellationToken;

use crate::{BlizzardClient, Error};

/// What one leaderboard request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  Leaderboard(Leaderboard),
  Error {
    kind:    &'static str,
    /// HTTP status, `0` when no response arrived.
    status:  u16,
    message: String,
  },
}

impl FetchOutcome {
  pub fn from_error(err: &Error) -> Self {
    Self::Error {
      kind:    err.kind(),
      status:  err.status(),
      message: err.to_string(),
    }
  }

  pub fn is_missing(&self) -> bool {
    matches!(self, Self::Error { status: 404, .. })
  }
}

#[derive(Debug, Clone)]
pub struct FetchResult {
  pub realm:   RealmInfo,
  pub dungeon: DungeonInfo,
  pub period:  i64,
  pub outcome: FetchOutcome,
}

/// Results of one [`fetch_all_realms`] call, in completion order.
///
/// Ends once every scheduled request has reported. After cancellation no
/// further requests are scheduled, so fewer than [`Self::expected`] results
/// may arrive.
pub struct FetchStream {
  rx:       mpsc::Receiver<FetchResult>,
  expected: usize,
}

impl FetchStream {
  pub async fn next(&mut self) -> Option<FetchResult> {
    self.rx.recv().await
  }

  /// Number of results a run without cancellation yields.
  pub fn expected(&self) -> usize {
    self.expected
  }
}

/// Request every (realm, dungeon) leaderboard for `period`, at most
/// `client.config().concurrency` at a time.
pub fn fetch_all_realms(
  client: &BlizzardClient,
  realms: Vec<RealmInfo>,
  dungeons: Vec<DungeonInfo>,
  period: i64,
  cancel: CancellationToken,
) -> FetchStream {
  let expected = realms.len() * dungeons.len();
  let concurrency = client.config().concurrency.max(1);
  let (tx, rx) = mpsc::channel(concurrency * 2);
  let client = client.clone();

  tokio::spawn(async move {
    let slots = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    'schedule: for realm in &realms {
      for dungeon in &dungeons {
        let permit = tokio::select! {
          biased;
          _ = cancel.cancelled() => break 'schedule,
          permit = Arc::clone(&slots).acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => break 'schedule,
          },
        };

        let client = client.clone();
        let tx = tx.clone();
        let realm = realm.clone();
        let dungeon = dungeon.clone();
        tasks.spawn(async move {
          let _permit = permit;
          let outcome = match client.leaderboard(&realm, &dungeon, period).await {
            Ok(leaderboard) => FetchOutcome::Leaderboard(leaderboard),
            Err(e) => FetchOutcome::from_error(&e),
          };
          let result = FetchResult { realm, dungeon, period, outcome };
          if tx.send(result).await.is_err() {
            tracing::debug!(period, "fetch stream dropped; discarding result");
          }
        });
      }
    }

    if cancel.is_cancelled() {
      tracing::info!(period, in_flight = tasks.len(), "fetch cancelled; draining");
    }
    while let Some(joined) = tasks.join_next().await {
      if let Err(e) = joined {
        tracing::error!(error = %e, "fetch task failed");
      }
    }
  });

  FetchStream { rx, expected }
}
