//! `ookstats`: fetch Challenge Mode leaderboards, rank them, and write the
//! static JSON site.
//!
//! # Usage
//!
//! ```
//! ookstats --db-file local.db fetch cm --regions us,eu
//! ookstats fingerprints
//! ookstats process
//! ookstats generate --out public
//! ookstats build
//! ```
//!
//! Vendor credentials come from `BLIZZARD_API_TOKEN`, or from
//! `BLIZZARD_CLIENT_ID` and `BLIZZARD_CLIENT_SECRET`.

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use ookstats_pipeline::AppConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ookstats", version, about = "Challenge Mode leaderboard pipeline")]
struct Cli {
  /// Path to a TOML config file (default: ./ookstats.toml if present).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// SQLite database path.
  #[arg(long, value_name = "PATH", global = true)]
  db_file: Option<PathBuf>,

  /// Debug logging and per-item progress.
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch data from the vendor API.
  #[command(subcommand)]
  Fetch(FetchCommand),
  /// Resolve player identities by achievement fingerprint.
  Fingerprints(IdentityArgs),
  /// Sync season windows and reassign runs to seasons.
  Seasons(RegionArgs),
  /// Rebuild rankings and player aggregates.
  Process,
  /// Write the static JSON tree.
  Generate(GenerateArgs),
  /// Run every stage in order.
  Build(BuildArgs),
}

#[derive(Subcommand, Debug)]
enum FetchCommand {
  /// Sweep Challenge Mode leaderboards.
  Cm(SweepArgs),
  /// Fetch character profiles of ranked players.
  Profiles(ProfileArgs),
}

#[derive(Args, Debug, Default)]
struct RegionArgs {
  /// Regions to include (default: us,eu,kr,tw).
  #[arg(long, value_delimiter = ',')]
  regions: Vec<String>,
}

#[derive(Args, Debug, Default)]
struct SweepArgs {
  #[command(flatten)]
  regions: RegionArgs,

  /// Realm slugs to include.
  #[arg(long, value_delimiter = ',')]
  realms: Vec<String>,

  /// Dungeon ids or slugs to include.
  #[arg(long, value_delimiter = ',')]
  dungeons: Vec<String>,

  /// Period ids, e.g. "1020-1036,1040" (default: the vendor's period index).
  #[arg(long)]
  periods: Option<String>,

  /// Maximum requests in flight.
  #[arg(long)]
  concurrency: Option<usize>,

  /// Leaderboards per ingestion transaction.
  #[arg(long)]
  batch_size: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct IdentityArgs {
  /// Players resolved concurrently.
  #[arg(long)]
  identity_batch: Option<usize>,

  /// Stop after this many players.
  #[arg(long)]
  max_players: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct ProfileArgs {
  /// Profiles fetched concurrently.
  #[arg(long)]
  profile_batch: Option<usize>,

  /// Stop after this many players.
  #[arg(long)]
  max_players: Option<usize>,

  /// Also refresh profiles older than this many hours.
  #[arg(long)]
  stale_after_hours: Option<u64>,
}

#[derive(Args, Debug, Default)]
struct GenerateArgs {
  #[command(flatten)]
  regions: RegionArgs,

  /// Output directory.
  #[arg(long)]
  out: Option<PathBuf>,

  #[arg(long)]
  page_size: Option<usize>,

  /// Players per search shard.
  #[arg(long)]
  shard_size: Option<usize>,

  /// Page writer tasks.
  #[arg(long)]
  workers: Option<usize>,

  #[arg(long)]
  no_players: bool,

  #[arg(long)]
  no_leaderboards: bool,

  #[arg(long)]
  no_search: bool,
}

#[derive(Args, Debug, Default)]
struct BuildArgs {
  #[command(flatten)]
  sweep: SweepArgs,

  #[command(flatten)]
  identity: IdentityArgs,

  /// Profiles fetched concurrently.
  #[arg(long)]
  profile_batch: Option<usize>,

  /// Also refresh profiles older than this many hours.
  #[arg(long)]
  stale_after_hours: Option<u64>,

  /// Skip the profile pass.
  #[arg(long)]
  skip_profiles: bool,

  /// Output directory.
  #[arg(long)]
  out: Option<PathBuf>,

  #[arg(long)]
  page_size: Option<usize>,

  #[arg(long)]
  workers: Option<usize>,
}

// ─── Overrides ───────────────────────────────────────────────────────────────

impl RegionArgs {
  fn apply(&self, cfg: &mut AppConfig) {
    if !self.regions.is_empty() {
      cfg.regions = self.regions.clone();
    }
  }
}

impl SweepArgs {
  fn apply(&self, cfg: &mut AppConfig) {
    self.regions.apply(cfg);
    if !self.realms.is_empty() {
      cfg.realms = self.realms.clone();
    }
    if !self.dungeons.is_empty() {
      cfg.dungeons = self.dungeons.clone();
    }
    if let Some(periods) = &self.periods {
      cfg.periods = periods.clone();
    }
    if let Some(n) = self.concurrency {
      cfg.concurrency = n;
    }
    if let Some(n) = self.batch_size {
      cfg.batch_size = n;
    }
  }
}

impl IdentityArgs {
  fn apply(&self, cfg: &mut AppConfig) {
    if let Some(n) = self.identity_batch {
      cfg.identity_batch = n;
    }
    if self.max_players.is_some() {
      cfg.max_players = self.max_players;
    }
  }
}

impl ProfileArgs {
  fn apply(&self, cfg: &mut AppConfig) {
    if let Some(n) = self.profile_batch {
      cfg.profile_batch = n;
    }
    if self.max_players.is_some() {
      cfg.max_players = self.max_players;
    }
    if self.stale_after_hours.is_some() {
      cfg.stale_after_hours = self.stale_after_hours;
    }
  }
}

impl GenerateArgs {
  fn apply(&self, cfg: &mut AppConfig) {
    self.regions.apply(cfg);
    if let Some(out) = &self.out {
      cfg.out = settings::expand_tilde(out);
    }
    if let Some(n) = self.page_size {
      cfg.page_size = n;
    }
    if let Some(n) = self.shard_size {
      cfg.shard_size = n;
    }
    if let Some(n) = self.workers {
      cfg.workers = n;
    }
    cfg.players &= !self.no_players;
    cfg.leaderboards &= !self.no_leaderboards;
    cfg.search &= !self.no_search;
  }
}

impl BuildArgs {
  fn apply(&self, cfg: &mut AppConfig) {
    self.sweep.apply(cfg);
    self.identity.apply(cfg);
    ProfileArgs {
      profile_batch:     self.profile_batch,
      max_players:       None,
      stale_after_hours: self.stale_after_hours,
    }
    .apply(cfg);
    cfg.skip_profiles |= self.skip_profiles;
    GenerateArgs {
      out: self.out.clone(),
      page_size: self.page_size,
      workers: self.workers,
      ..GenerateArgs::default()
    }
    .apply(cfg);
  }
}

impl Cli {
  /// Apply global and per-command overrides on top of the loaded layers.
  fn apply(&self, cfg: &mut AppConfig) {
    if let Some(db_file) = &self.db_file {
      cfg.db_file = settings::expand_tilde(db_file);
    }
    cfg.verbose |= self.verbose;
    match &self.command {
      Command::Fetch(FetchCommand::Cm(args)) => args.apply(cfg),
      Command::Fetch(FetchCommand::Profiles(args)) => args.apply(cfg),
      Command::Fingerprints(args) => args.apply(cfg),
      Command::Seasons(args) => args.apply(cfg),
      Command::Process => {}
      Command::Generate(args) => args.apply(cfg),
      Command::Build(args) => args.apply(cfg),
    }
  }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let mut cfg = settings::load(cli.config.as_deref(), None)?;
  cli.apply(&mut cfg);

  let level = if cfg.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy(),
    )
    .init();

  let cancel = commands::cancel_on_ctrl_c();
  match cli.command {
    Command::Fetch(FetchCommand::Cm(_)) => commands::fetch_cm(&cfg, &cancel).await,
    Command::Fetch(FetchCommand::Profiles(_)) => commands::fetch_profiles(&cfg, &cancel).await,
    Command::Fingerprints(_) => commands::fingerprints(&cfg).await,
    Command::Seasons(_) => commands::seasons(&cfg).await,
    Command::Process => commands::process(&cfg).await,
    Command::Generate(_) => commands::generate(&cfg).await,
    Command::Build(_) => commands::build(&cfg, &cancel).await,
  }
  .context("ookstats failed")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> (Cli, AppConfig) {
    let cli = Cli::try_parse_from(std::iter::once("ookstats").chain(args.iter().copied())).unwrap();
    let mut cfg = AppConfig::default();
    cli.apply(&mut cfg);
    (cli, cfg)
  }

  #[test]
  fn sweep_flags_override_config() {
    let (_, cfg) = parse(&[
      "--db-file",
      "x.db",
      "fetch",
      "cm",
      "--regions",
      "us,eu",
      "--dungeons",
      "2,mogu-shan-palace",
      "--periods",
      "1020-1021",
      "--concurrency",
      "5",
    ]);
    assert_eq!(cfg.db_file, PathBuf::from("x.db"));
    assert_eq!(cfg.regions, vec!["us", "eu"]);
    assert_eq!(cfg.dungeons, vec!["2", "mogu-shan-palace"]);
    assert_eq!(cfg.periods, "1020-1021");
    assert_eq!(cfg.concurrency, 5);
  }

  #[test]
  fn global_flags_follow_the_subcommand() {
    let (_, cfg) = parse(&["process", "--verbose", "--db-file", "y.db"]);
    assert!(cfg.verbose);
    assert_eq!(cfg.db_file, PathBuf::from("y.db"));
  }

  #[test]
  fn generate_switches_disable_sections() {
    let (_, cfg) = parse(&["generate", "--no-search", "--page-size", "50", "--out", "site"]);
    assert!(!cfg.search);
    assert!(cfg.players);
    assert_eq!(cfg.page_size, 50);
    assert_eq!(cfg.out, PathBuf::from("site"));
  }

  #[test]
  fn build_collects_every_stage_override() {
    let (cli, cfg) = parse(&["build", "--skip-profiles", "--max-players", "10", "--regions", "kr"]);
    assert!(matches!(cli.command, Command::Build(_)));
    assert!(cfg.skip_profiles);
    assert_eq!(cfg.max_players, Some(10));
    assert_eq!(cfg.regions, vec!["kr"]);
  }

  #[test]
  fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
  }
}
