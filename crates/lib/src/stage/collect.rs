//! Artifact collection: copy a runtime directory to its stable location.

use std::fs;
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::stage::StageError;

/// Recursively copy `source` into `dest`, preserving the relative layout.
pub fn collect_artifacts(source: &Path, dest: &Path) -> Result<u64, StageError> {
  if !source.is_dir() {
    return Err(StageError::fs(
      "read",
      source,
      std::io::Error::new(std::io::ErrorKind::NotFound, "runtime directory not found"),
    ));
  }

  info!(from = ?source, to = ?dest, "collecting artifacts");
  fs::create_dir_all(dest).map_err(|e| StageError::fs("create", dest, e))?;

  let mut copied = 0u64;
  for entry in WalkDir::new(source).min_depth(1) {
    let entry = entry.map_err(|e| {
      let path = e.path().unwrap_or(source).to_path_buf();
      StageError::fs("read", &path, e.into())
    })?;

    let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
    let target = dest.join(relative);

    if entry.file_type().is_dir() {
      fs::create_dir_all(&target).map_err(|e| StageError::fs("create", &target, e))?;
    } else {
      fs::copy(entry.path(), &target).map_err(|e| StageError::fs("copy", entry.path(), e))?;
      copied += 1;
    }
  }

  debug!(files = copied, dest = ?dest, "artifacts collected");
  Ok(copied)
}
