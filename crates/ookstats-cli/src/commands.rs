//! One function per subcommand.

use anyhow::Context as _;
use ookstats_blizzard::{BlizzardClient, Credentials};
use ookstats_pipeline::{
  AppConfig,
  fetch::fetch_challenge_mode,
  identity::{IdentityEngine, IdentityOptions},
  process::rebuild_rankings,
  profiles,
  seasons::sync_seasons,
};
use ookstats_static::EmitOptions;
use ookstats_store_sqlite::SqliteStore;
use tokio_util::sync::CancellationToken;

/// A token cancelled on the first Ctrl-C. In-flight work finishes and what
/// was fetched so far is still persisted.
pub fn cancel_on_ctrl_c() -> CancellationToken {
  let token = CancellationToken::new();
  let trigger = token.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("interrupt received; stopping after in-flight requests");
      trigger.cancel();
    }
  });
  token
}

async fn open_store(cfg: &AppConfig) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(&cfg.db_file)
    .await
    .with_context(|| format!("failed to open database at {}", cfg.db_file.display()))
}

fn client(cfg: &AppConfig) -> anyhow::Result<BlizzardClient> {
  let credentials = Credentials::from_env().context("missing vendor API credentials")?;
  BlizzardClient::new(credentials, cfg.client_config()).context("failed to build API client")
}

fn emit_options(cfg: &AppConfig) -> EmitOptions {
  EmitOptions {
    out:          cfg.out.clone(),
    page_size:    cfg.page_size,
    shard_size:   cfg.shard_size,
    workers:      cfg.workers,
    regions:      cfg.regions.clone(),
    players:      cfg.players,
    leaderboards: cfg.leaderboards,
    search:       cfg.search,
  }
}

// ─── Stages ──────────────────────────────────────────────────────────────────

pub async fn fetch_cm(cfg: &AppConfig, cancel: &CancellationToken) -> anyhow::Result<()> {
  let store = open_store(cfg).await?;
  let client = client(cfg)?;
  sweep(&store, &client, cfg, cancel).await
}

pub async fn fetch_profiles(cfg: &AppConfig, cancel: &CancellationToken) -> anyhow::Result<()> {
  let store = open_store(cfg).await?;
  let client = client(cfg)?;
  profiles::fetch_profiles(&store, &client, cfg, cancel)
    .await
    .context("profile pass failed")?;
  Ok(())
}

pub async fn fingerprints(cfg: &AppConfig) -> anyhow::Result<()> {
  let store = open_store(cfg).await?;
  let client = client(cfg)?;
  identities(&store, &client, cfg).await
}

pub async fn seasons(cfg: &AppConfig) -> anyhow::Result<()> {
  let store = open_store(cfg).await?;
  let client = client(cfg)?;
  sync(&store, &client, cfg).await
}

pub async fn process(cfg: &AppConfig) -> anyhow::Result<()> {
  let store = open_store(cfg).await?;
  rebuild_rankings(&store).await.context("ranking rebuild failed")?;
  Ok(())
}

pub async fn generate(cfg: &AppConfig) -> anyhow::Result<()> {
  let store = open_store(cfg).await?;
  ookstats_static::emit(&store, &emit_options(cfg))
    .await
    .with_context(|| format!("failed to write site to {}", cfg.out.display()))?;
  Ok(())
}

/// Sweep, seasons, fingerprints, rankings, profiles, rankings again, then
/// the static tree.
pub async fn build(cfg: &AppConfig, cancel: &CancellationToken) -> anyhow::Result<()> {
  let store = open_store(cfg).await?;
  let client = client(cfg)?;

  sweep(&store, &client, cfg, cancel).await?;
  sync(&store, &client, cfg).await?;
  identities(&store, &client, cfg).await?;
  rebuild_rankings(&store).await.context("ranking rebuild failed")?;

  if cfg.skip_profiles {
    tracing::info!("skipping profile pass");
  } else if cancel.is_cancelled() {
    tracing::warn!("interrupted; skipping profile pass");
  } else {
    profiles::fetch_profiles(&store, &client, cfg, cancel)
      .await
      .context("profile pass failed")?;
    rebuild_rankings(&store).await.context("ranking rebuild failed")?;
  }

  ookstats_static::emit(&store, &emit_options(cfg))
    .await
    .with_context(|| format!("failed to write site to {}", cfg.out.display()))?;
  Ok(())
}

async fn sweep(
  store: &SqliteStore,
  client: &BlizzardClient,
  cfg: &AppConfig,
  cancel: &CancellationToken,
) -> anyhow::Result<()> {
  let summary = fetch_challenge_mode(store, client, cfg, cancel)
    .await
    .context("leaderboard sweep failed")?;
  if summary.totals.failed_batches > 0 {
    tracing::warn!(failed_batches = summary.totals.failed_batches, "some batches were rolled back");
  }
  Ok(())
}

async fn sync(store: &SqliteStore, client: &BlizzardClient, cfg: &AppConfig) -> anyhow::Result<()> {
  sync_seasons(store, client, &cfg.region_list())
    .await
    .context("season sync failed")?;
  Ok(())
}

async fn identities(
  store: &SqliteStore,
  client: &BlizzardClient,
  cfg: &AppConfig,
) -> anyhow::Result<()> {
  let options = IdentityOptions { batch_size: cfg.identity_batch, max_players: cfg.max_players };
  IdentityEngine::load(store.clone(), client.clone(), options)
    .await
    .context("failed to load fingerprints")?
    .run()
    .await
    .context("identity pass failed")?;
  Ok(())
}
