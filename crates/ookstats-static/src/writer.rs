//! Atomic JSON file writes.
//!
//! A page is first written to a hidden sibling `.tmp-<name>-<n>`, synced,
//! then renamed over the target, so readers only ever see complete files.

use std::{
  fs::{self, File},
  io::Write,
  path::Path,
  sync::atomic::{AtomicU64, Ordering},
};

use serde::Serialize;

use crate::{Error, Result};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
  #[default]
  Pretty,
  Compact,
}

/// Encode `value` and write it atomically to `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, format: Format) -> Result<()> {
  let encoded = match format {
    Format::Pretty => serde_json::to_vec_pretty(value),
    Format::Compact => serde_json::to_vec(value),
  };
  let mut bytes = encoded.map_err(|source| Error::Encode { path: path.to_owned(), source })?;
  if format == Format::Pretty {
    bytes.push(b'\n');
  }
  write_atomic(path, &bytes)
}

/// Write `bytes` to `path` through a synced temp file and a rename.
///
/// Missing parent directories are created with mode 0755. The temp file is
/// removed when any step fails.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
  let io_err = |source| Error::Write { path: path.to_owned(), source };

  let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
  create_dir(dir).map_err(io_err)?;

  let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("page");
  let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
  let tmp = dir.join(format!(".tmp-{name}-{n}"));

  let written = (|| {
    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)
  })();

  if let Err(e) = written {
    let _ = fs::remove_file(&tmp);
    return Err(io_err(e));
  }
  Ok(())
}

#[cfg(unix)]
fn create_dir(dir: &Path) -> std::io::Result<()> {
  use std::os::unix::fs::DirBuilderExt;
  fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_dir(dir: &Path) -> std::io::Result<()> {
  fs::create_dir_all(dir)
}
