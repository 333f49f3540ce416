//! The ookstats batch pipeline.
//!
//! Each stage reads and writes through a [`RunStore`](ookstats_core::store::RunStore):
//!
//! - [`fetch`]: the leaderboard sweep and its batching persister;
//! - [`seasons`]: season windows from the vendor index;
//! - [`identity`]: fingerprint reconciliation;
//! - [`profiles`]: character profile enrichment;
//! - [`process`]: the ranking rebuild.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub mod config;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod process;
pub mod profiles;
pub mod seasons;
pub mod vendor;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use vendor::VendorApi;

/// A child of `parent` that also fires once `after` has elapsed.
pub(crate) fn deadline_token(parent: &CancellationToken, after: Duration) -> CancellationToken {
  let token = parent.child_token();
  let timer = token.clone();
  tokio::spawn(async move {
    tokio::select! {
      _ = timer.cancelled() => {}
      _ = tokio::time::sleep(after) => {
        tracing::warn!(after_s = after.as_secs(), "deadline reached; stopping");
        timer.cancel();
      }
    }
  });
  token
}

#[cfg(test)]
mod tests;
