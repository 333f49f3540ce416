//! Retry wrapper for SQLite lock contention.

use std::{future::Future, time::Duration};

use crate::Result;

pub(crate) const BUSY_RETRY_ATTEMPTS: u32 = 8;

/// Delay before retry number `attempt` (0-based): `(attempt + 1) * 100ms`,
/// capped at one second.
pub(crate) fn busy_delay(attempt: u32) -> Duration {
  Duration::from_millis((u64::from(attempt) + 1).saturating_mul(100).min(1000))
}

/// Run `op` until it succeeds, fails with a non-busy error, or exhausts
/// [`BUSY_RETRY_ATTEMPTS`].
pub(crate) async fn with_busy_retry<T, F, Fut>(mut op: F) -> Result<T>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let mut attempt = 0;
  loop {
    match op().await {
      Err(e) if e.is_busy() && attempt + 1 < BUSY_RETRY_ATTEMPTS => {
        let delay = busy_delay(attempt);
        tracing::debug!(attempt, ?delay, "database busy; retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      other => return other,
    }
  }
}
