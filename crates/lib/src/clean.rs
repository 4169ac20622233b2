//! Removal of stage outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::stage::Stage;

#[derive(Debug, Error)]
pub enum CleanError {
  #[error("failed to remove {}: {source}", path.display())]
  Remove {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
  /// Also remove downloaded archives and cloned sources.
  pub remove_acquired_sources: bool,
  /// Report what would be removed without touching anything.
  pub dry_run: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct CleanReport {
  pub removed: Vec<PathBuf>,
  pub bytes_freed: u64,
  pub dry_run: bool,
}

/// Remove the outputs of `stages`.
///
/// Build and collection outputs go first, then acquisition destinations when
/// requested. Missing outputs are skipped, so repeating a clean is a no-op.
/// Space nested in an output that was already counted is not counted again,
/// so a dry run reports the same `bytes_freed` as the real clean.
pub fn clean(stages: &[Stage], options: CleanOptions) -> Result<CleanReport, CleanError> {
  let mut report = CleanReport {
    dry_run: options.dry_run,
    ..CleanReport::default()
  };

  let derived = stages.iter().filter(|s| !s.is_acquisition());
  let acquired = stages
    .iter()
    .filter(|s| s.is_acquisition() && options.remove_acquired_sources);

  for stage in derived.chain(acquired) {
    let marker = stage.marker_path();
    if !marker.starts_with(&stage.output) && marker.exists() && !options.dry_run {
      remove(&marker)?;
    }

    if !stage.output.exists() {
      debug!(stage = %stage.id, path = ?stage.output, "nothing to remove");
      continue;
    }

    report.bytes_freed += dir_size(&stage.output, &report.removed);
    if !options.dry_run {
      remove(&stage.output)?;
    }
    info!(stage = %stage.id, path = ?stage.output, dry_run = options.dry_run, "removed stage output");
    report.removed.push(stage.output.clone());
  }

  Ok(report)
}

fn remove(path: &Path) -> Result<(), CleanError> {
  let result = if path.is_dir() {
    fs::remove_dir_all(path)
  } else {
    fs::remove_file(path)
  };
  result.map_err(|source| CleanError::Remove {
    path: path.to_path_buf(),
    source,
  })
}

/// Total file size below `path`, leaving out the `counted` directories.
fn dir_size(path: &Path, counted: &[PathBuf]) -> u64 {
  WalkDir::new(path)
    .into_iter()
    .filter_entry(|e| !counted.iter().any(|c| c == e.path()))
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .filter_map(|e| e.metadata().ok())
    .map(|m| m.len())
    .sum()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::BuildConfig;
  use crate::pipeline::every_variant_stages;
  use tempfile::TempDir;

  fn populate(root: &Path) {
    for dir in [
      "deps/win64",
      "cef/build",
      "obs-studio/build/rundir/Release",
      "cbuild",
      "build/Debug",
      "build/Release",
    ] {
      fs::create_dir_all(root.join(dir)).unwrap();
    }
    fs::write(root.join("obs-studio/build/CMakeCache.txt"), "cache").unwrap();
    fs::write(root.join("deps/win64/README"), "deps").unwrap();
  }

  #[test]
  fn keeps_acquired_sources_by_default() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let stages = every_variant_stages(temp.path(), &BuildConfig::default()).unwrap();

    let report = clean(&stages, CleanOptions::default()).unwrap();

    for gone in ["cef/build", "obs-studio/build", "cbuild", "build/Debug", "build/Release"] {
      assert!(!temp.path().join(gone).exists(), "{}", gone);
    }
    for kept in ["deps/win64/README", "cef", "obs-studio"] {
      assert!(temp.path().join(kept).exists(), "{}", kept);
    }
    assert_eq!(report.removed.len(), 5);
    assert_eq!(report.bytes_freed, 5);
  }

  #[test]
  fn clean_src_removes_everything() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let stages = every_variant_stages(temp.path(), &BuildConfig::default()).unwrap();
    let options = CleanOptions {
      remove_acquired_sources: true,
      dry_run: false,
    };

    let report = clean(&stages, options).unwrap();

    for gone in ["deps", "cef", "obs-studio", "cbuild", "build/Release"] {
      assert!(!temp.path().join(gone).exists(), "{}", gone);
    }
    assert_eq!(report.removed.len(), 8);
  }

  #[test]
  fn repeated_clean_is_noop() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let stages = every_variant_stages(temp.path(), &BuildConfig::default()).unwrap();
    let options = CleanOptions {
      remove_acquired_sources: true,
      dry_run: false,
    };

    clean(&stages, options).unwrap();
    let second = clean(&stages, options).unwrap();

    assert!(second.removed.is_empty());
    assert_eq!(second.bytes_freed, 0);
  }

  #[test]
  fn dry_run_touches_nothing() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    let stages = every_variant_stages(temp.path(), &BuildConfig::default()).unwrap();
    let options = CleanOptions {
      remove_acquired_sources: true,
      dry_run: true,
    };

    let report = clean(&stages, options).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.removed.len(), 8);
    assert!(temp.path().join("obs-studio/build/CMakeCache.txt").exists());
    assert!(temp.path().join("deps/win64/README").exists());
  }

  #[test]
  fn dry_run_reports_same_space_as_real_clean() {
    let options = CleanOptions {
      remove_acquired_sources: true,
      dry_run: false,
    };
    let dry = TempDir::new().unwrap();
    let real = TempDir::new().unwrap();
    for temp in [&dry, &real] {
      populate(temp.path());
      fs::write(temp.path().join("obs-studio/CMakeLists.txt"), "project()\n").unwrap();
    }

    let dry_stages = every_variant_stages(dry.path(), &BuildConfig::default()).unwrap();
    let dry_report = clean(&dry_stages, CleanOptions { dry_run: true, ..options }).unwrap();
    let real_stages = every_variant_stages(real.path(), &BuildConfig::default()).unwrap();
    let real_report = clean(&real_stages, options).unwrap();

    assert_eq!(real_report.bytes_freed, 19);
    assert_eq!(dry_report.bytes_freed, real_report.bytes_freed);
    assert_eq!(dry_report.removed.len(), real_report.removed.len());
  }

  #[test]
  fn removes_markers_beside_outputs() {
    let temp = TempDir::new().unwrap();
    populate(temp.path());
    fs::write(temp.path().join("obs-studio.scissors-complete"), "{}").unwrap();
    fs::write(temp.path().join("build/Release.scissors-complete"), "{}").unwrap();
    let stages = every_variant_stages(temp.path(), &BuildConfig::default()).unwrap();

    clean(&stages, CleanOptions::default()).unwrap();
    assert!(!temp.path().join("build/Release.scissors-complete").exists());
    assert!(temp.path().join("obs-studio.scissors-complete").exists());

    let options = CleanOptions {
      remove_acquired_sources: true,
      dry_run: false,
    };
    clean(&stages, options).unwrap();
    assert!(!temp.path().join("obs-studio.scissors-complete").exists());
  }
}
