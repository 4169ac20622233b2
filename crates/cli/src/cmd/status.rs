//! Status command implementation.
//!
//! Reports the cache state of every stage of a variant without running anything.

use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Serialize;

use scissors_lib::cache::{CacheMode, CacheState, read_marker};
use scissors_lib::config::BuildConfig;
use scissors_lib::paths::root_dir;
use scissors_lib::pipeline::PipelineBuilder;
use scissors_lib::variant::BuildVariant;

use crate::output::{OutputFormat, print_info, print_json, print_skipped, print_stat, print_success, print_warning};

#[derive(Debug, Serialize)]
struct StageEntry {
  stage: String,
  kind: &'static str,
  path: PathBuf,
  state: CacheState,
  completed_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
  root: PathBuf,
  variant: String,
  cache: CacheMode,
  stages: Vec<StageEntry>,
}

pub fn cmd_status(root: Option<&Path>, variant: BuildVariant, output: OutputFormat) -> Result<()> {
  let root = root_dir(root).context("Failed to resolve build root")?;
  let config = BuildConfig::load(&root)?;
  let pipeline = PipelineBuilder::new(&root, &config)
    .variant(variant)
    .build()
    .context("Invalid pipeline")?;

  let stages: Vec<StageEntry> = pipeline
    .stages()
    .iter()
    .map(|stage| StageEntry {
      stage: stage.id.to_string(),
      kind: stage.kind.label(),
      path: stage.output.clone(),
      state: pipeline.cache().state(&stage.output, &stage.marker_path()),
      completed_at: completed_at(&stage.marker_path()),
    })
    .collect();

  let status = StatusOutput {
    root,
    variant: variant.to_string(),
    cache: config.cache,
    stages,
  };

  if output.is_json() {
    return print_json(&status);
  }

  print_info(&format!("{} in {}", status.variant, status.root.display()));
  println!();
  for entry in &status.stages {
    let line = format!("{} {}", entry.stage, entry.path.display());
    match entry.state {
      CacheState::Complete => print_success(&line),
      CacheState::Incomplete => print_warning(&format!("{} (incomplete)", line)),
      CacheState::Absent => print_skipped(&format!("{} (not built)", line)),
    }
    if let Some(time) = &entry.completed_at {
      print_stat("Completed", time);
    }
  }

  let complete = status
    .stages
    .iter()
    .filter(|e| e.state == CacheState::Complete)
    .count();
  println!();
  print_stat("Complete", &format!("{}/{}", complete, status.stages.len()));

  Ok(())
}

/// Completion time recorded in the stage marker, if any.
fn completed_at(marker_path: &Path) -> Option<String> {
  let marker = read_marker(marker_path).ok().flatten()?;
  let time = UNIX_EPOCH + Duration::from_secs(marker.completed_at_unix);
  Some(humantime::format_rfc3339_seconds(time).to_string())
}
