//! Stage completion tracking.
//!
//! The cache is keyed purely by each stage's output directory. In `presence`
//! mode an existing directory means the stage is done. In `marker` mode the
//! stage must also have a completion marker, which is only written after the
//! stage fully succeeded. Where the marker lives is decided by
//! [`Stage::marker_path`](crate::stage::Stage::marker_path).

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::STAGE_MARKER_VERSION;
use crate::stage::{StageError, StageId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
  /// Complete once the output directory exists and carries a marker.
  #[default]
  Marker,
  /// Complete as soon as the output directory exists.
  Presence,
}

/// Marker file content structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMarker {
  /// Marker format version.
  pub version: u32,
  /// Stage that produced the output.
  pub stage: String,
  /// Always "complete".
  pub status: String,
  pub completed_at_unix: u64,
}

#[derive(Debug, Error)]
pub enum MarkerError {
  #[error("failed to read marker: {0}")]
  Read(#[from] std::io::Error),

  #[error("failed to parse marker: {0}")]
  Parse(#[from] serde_json::Error),
}

/// What the cache knows about one stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
  /// Nothing at the output path.
  Absent,
  /// Output directory exists but carries no valid marker.
  Incomplete,
  Complete,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StageCache {
  mode: CacheMode,
}

impl StageCache {
  pub fn new(mode: CacheMode) -> Self {
    Self { mode }
  }

  pub fn mode(&self) -> CacheMode {
    self.mode
  }

  /// Pure existence check.
  pub fn exists(path: &Path) -> bool {
    path.exists()
  }

  pub fn state(&self, output: &Path, marker: &Path) -> CacheState {
    if !Self::exists(output) {
      return CacheState::Absent;
    }

    match self.mode {
      CacheMode::Presence => CacheState::Complete,
      CacheMode::Marker => match read_marker(marker) {
        Ok(Some(_)) => CacheState::Complete,
        Ok(None) => CacheState::Incomplete,
        Err(e) => {
          debug!(path = ?output, error = %e, "invalid marker, treating as incomplete");
          CacheState::Incomplete
        }
      },
    }
  }

  pub fn is_complete(&self, output: &Path, marker: &Path) -> bool {
    self.state(output, marker) == CacheState::Complete
  }

  /// Record that `stage` finished. Must be called last, after every side effect.
  pub fn mark_complete(&self, marker_path: &Path, stage: &StageId) -> Result<(), StageError> {
    if self.mode == CacheMode::Presence {
      return Ok(());
    }

    let marker = StageMarker {
      version: STAGE_MARKER_VERSION,
      stage: stage.0.clone(),
      status: "complete".to_string(),
      completed_at_unix: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs(),
    };
    let content = serde_json::to_string(&marker).map_err(|e| StageError::fs("write", &marker_path, e.into()))?;
    std::fs::write(&marker_path, format!("{}\n", content)).map_err(|e| StageError::fs("write", &marker_path, e))
  }
}

/// Read a completion marker.
///
/// Returns `None` if the marker doesn't exist.
pub fn read_marker(marker_path: &Path) -> Result<Option<StageMarker>, MarkerError> {
  if !marker_path.exists() {
    return Ok(None);
  }

  let content = std::fs::read_to_string(marker_path)?;
  let marker: StageMarker = serde_json::from_str(&content)?;
  Ok(Some(marker))
}

/// Remove a marker left over from an earlier run, if any.
pub fn clear_marker(marker_path: &Path) -> Result<(), StageError> {
  match std::fs::remove_file(marker_path) {
    Ok(()) => Ok(()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
    Err(e) => Err(StageError::fs("remove", marker_path, e)),
  }
}
