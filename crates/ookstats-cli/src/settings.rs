//! Configuration layering: an optional TOML file, then `OOKSTATS_*`
//! environment variables, then command-line overrides.

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use ookstats_pipeline::AppConfig;

pub const ENV_PREFIX: &str = "OOKSTATS";
pub const DEFAULT_CONFIG_FILE: &str = "ookstats.toml";

/// Keys read from the environment as comma-separated lists.
const LIST_KEYS: [&str; 3] = ["regions", "realms", "dungeons"];

/// Load the file and environment layers.
///
/// `file` is required when given explicitly; otherwise `ookstats.toml` in
/// the working directory is read if present. `env` replaces the process
/// environment, for tests.
pub fn load(file: Option<&Path>, env: Option<HashMap<String, String>>) -> anyhow::Result<AppConfig> {
  let (path, required) = match file {
    Some(path) => (path.to_path_buf(), true),
    None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
  };

  let mut environment = Environment::with_prefix(ENV_PREFIX)
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
    .list_separator(",")
    .source(env);
  for key in LIST_KEYS {
    environment = environment.with_list_parse_key(key);
  }

  let settings = Config::builder()
    .add_source(File::from(path.clone()).format(FileFormat::Toml).required(required))
    .add_source(environment)
    .build()
    .with_context(|| format!("failed to read configuration from {}", path.display()))?;

  let mut config: AppConfig =
    settings.try_deserialize().context("failed to deserialise configuration")?;
  config.db_file = expand_tilde(&config.db_file);
  config.out = expand_tilde(&config.out);
  Ok(config)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect())
  }

  #[test]
  fn defaults_without_sources() {
    let cfg = load(None, env(&[])).unwrap();
    assert_eq!(cfg.db_file, PathBuf::from("local.db"));
    assert_eq!(cfg.page_size, 25);
    assert_eq!(cfg.concurrency, 20);
    assert!(cfg.regions.is_empty());
  }

  #[test]
  fn environment_overrides_file() {
    let dir = std::env::temp_dir().join(format!("ookstats-cli-settings-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let file = dir.join("config.toml");
    fs::write(&file, "db_file = \"from-file.db\"\npage_size = 50\nregions = [\"eu\"]\n").unwrap();

    let cfg = load(
      Some(&file),
      env(&[
        ("OOKSTATS_PAGE_SIZE", "10"),
        ("OOKSTATS_REGIONS", "us,kr"),
        ("OOKSTATS_MAX_PLAYERS", "500"),
        ("OOKSTATS_SKIP_PROFILES", "true"),
        ("OOKSTATS_PERIODS", "1020-1022"),
      ]),
    )
    .unwrap();
    assert_eq!(cfg.db_file, PathBuf::from("from-file.db"));
    assert_eq!(cfg.page_size, 10);
    assert_eq!(cfg.regions, vec!["us", "kr"]);
    assert_eq!(cfg.max_players, Some(500));
    assert!(cfg.skip_profiles);
    assert_eq!(cfg.period_ids().unwrap(), vec![1022, 1021, 1020]);

    fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn explicit_file_must_exist() {
    let missing = Path::new("/nonexistent/ookstats.toml");
    assert!(load(Some(missing), env(&[])).is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(expand_tilde(Path::new("~/data/local.db")), Path::new(&home).join("data/local.db"));
    assert_eq!(expand_tilde(Path::new("local.db")), PathBuf::from("local.db"));
  }
}
