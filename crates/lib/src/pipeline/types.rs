//! Result and error types of a pipeline run.

use serde::Serialize;
use thiserror::Error;

use crate::stage::{ErrorCategory, StageId};

/// Errors raised while assembling a pipeline, before anything runs.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// Two stages share an id.
  #[error("duplicate stage '{0}'")]
  DuplicateStage(StageId),

  /// A stage appears after one from a later phase.
  #[error("stage '{stage}' ({kind}) is out of order: acquisitions, then builds, then collection")]
  OutOfOrder { stage: StageId, kind: &'static str },

  /// A stage reads the output of a stage that does not run before it.
  #[error("stage '{stage}' depends on '{dependency}', which is not produced by an earlier stage")]
  UnknownDependency { stage: StageId, dependency: StageId },

  /// The archive format cannot be inferred from the URL.
  #[error("unsupported archive format: {url}")]
  UnsupportedArchive { url: String },
}

impl PipelineError {
  pub fn category(&self) -> ErrorCategory {
    ErrorCategory::Configuration
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
  /// The stage executed and its output is now complete.
  Ran,
  /// The output was already complete.
  Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
  pub stage: StageId,
  pub status: StageStatus,
}

/// The first stage that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
  pub stage: StageId,
  pub category: ErrorCategory,
  pub message: String,
}

/// Terminal status of a run.
///
/// `outcomes` lists the stages that finished, in order. When `failure` is set
/// it names the stage that stopped the run; nothing after it was attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
  pub outcomes: Vec<StageOutcome>,
  pub failure: Option<StageFailure>,
}

impl PipelineReport {
  pub fn is_success(&self) -> bool {
    self.failure.is_none()
  }

  /// Process exit status for the run.
  pub fn exit_code(&self) -> i32 {
    if self.is_success() { 0 } else { 1 }
  }

  pub fn ran(&self) -> usize {
    self.count(StageStatus::Ran)
  }

  pub fn skipped(&self) -> usize {
    self.count(StageStatus::Skipped)
  }

  fn count(&self, status: StageStatus) -> usize {
    self.outcomes.iter().filter(|o| o.status == status).count()
  }
}
