//! The staged build pipeline.
//!
//! A [`Pipeline`] is an ordered list of stages run strictly one after the
//! other: acquisitions, then builds, then artifact collection. Every stage is
//! gated by the [`StageCache`] on its output directory, and the first failure
//! ends the run. Later stages find earlier outputs through
//! [`DependencyPaths`], which is filled as each stage completes or is skipped.

pub mod builder;
mod types;

use std::collections::HashSet;

use tracing::{error, info, warn};

use crate::cache::{CacheMode, CacheState, StageCache, clear_marker};
use crate::process::ProcessRunner;
use crate::stage::acquire::{clone_source, download_archive};
use crate::stage::build::build_project;
use crate::stage::collect::collect_artifacts;
use crate::stage::{DependencyPaths, Downloader, Stage, StageError, StageKind};

pub use builder::{PipelineBuilder, every_variant_stages};
pub use types::{PipelineError, PipelineReport, StageFailure, StageOutcome, StageStatus};

#[derive(Debug, Clone)]
pub struct Pipeline {
  stages: Vec<Stage>,
  cache: StageCache,
}

impl Pipeline {
  /// Validate and assemble a pipeline.
  ///
  /// Stage ids must be unique, phases must not go backwards, and every
  /// dependency must name a stage that runs earlier.
  pub fn new(stages: Vec<Stage>, cache_mode: CacheMode) -> Result<Self, PipelineError> {
    let mut seen = HashSet::new();
    let mut phase = 0;

    for stage in &stages {
      for dependency in stage.kind.dependencies() {
        if !seen.contains(dependency) {
          return Err(PipelineError::UnknownDependency {
            stage: stage.id.clone(),
            dependency: dependency.clone(),
          });
        }
      }

      if stage.kind.phase() < phase {
        return Err(PipelineError::OutOfOrder {
          stage: stage.id.clone(),
          kind: stage.kind.label(),
        });
      }
      phase = stage.kind.phase();

      if !seen.insert(stage.id.clone()) {
        return Err(PipelineError::DuplicateStage(stage.id.clone()));
      }
    }

    Ok(Self {
      stages,
      cache: StageCache::new(cache_mode),
    })
  }

  pub fn stages(&self) -> &[Stage] {
    &self.stages
  }

  pub fn cache(&self) -> &StageCache {
    &self.cache
  }

  /// Run every stage in order, stopping at the first failure.
  pub async fn run<R, D>(&self, runner: &R, downloader: &D) -> PipelineReport
  where
    R: ProcessRunner,
    D: Downloader,
  {
    info!(stages = self.stages.len(), cache = ?self.cache.mode(), "starting pipeline");

    let mut report = PipelineReport::default();
    let mut deps = DependencyPaths::default();

    for stage in &self.stages {
      match self.run_stage(stage, &deps, runner, downloader).await {
        Ok(status) => {
          deps.insert(stage.id.clone(), stage.output.clone());
          report.outcomes.push(StageOutcome {
            stage: stage.id.clone(),
            status,
          });
        }
        Err(e) => {
          error!(stage = %stage.id, category = %e.category(), error = %e, "stage failed");
          report.failure = Some(StageFailure {
            stage: stage.id.clone(),
            category: e.category(),
            message: e.to_string(),
          });
          return report;
        }
      }
    }

    info!(ran = report.ran(), skipped = report.skipped(), "pipeline complete");
    report
  }

  async fn run_stage<R, D>(
    &self,
    stage: &Stage,
    deps: &DependencyPaths,
    runner: &R,
    downloader: &D,
  ) -> Result<StageStatus, StageError>
  where
    R: ProcessRunner,
    D: Downloader,
  {
    let marker = stage.marker_path();
    match self.cache.state(&stage.output, &marker) {
      CacheState::Complete => {
        info!(stage = %stage.id, path = ?stage.output, "already complete, skipping");
        return Ok(StageStatus::Skipped);
      }
      CacheState::Incomplete => {
        warn!(stage = %stage.id, path = ?stage.output, "discarding incomplete output");
        tokio::fs::remove_dir_all(&stage.output)
          .await
          .map_err(|e| StageError::fs("remove", &stage.output, e))?;
      }
      CacheState::Absent => {}
    }
    clear_marker(&marker)?;

    info!(stage = %stage.id, kind = stage.kind.label(), path = ?stage.output, "running stage");

    match &stage.kind {
      StageKind::Archive(source) => download_archive(source, &stage.output, runner, downloader).await?,
      StageKind::Clone(source) => clone_source(source, &stage.output, runner).await?,
      StageKind::Build(spec) => build_project(spec, &stage.output, deps, runner).await?,
      StageKind::Collect(spec) => {
        let source = deps.resolve(&spec.source)?;
        collect_artifacts(&source, &stage.output)?;
      }
    }

    // Written last: a stage interrupted before this point is rebuilt next run.
    self.cache.mark_complete(&marker, &stage.id)?;
    Ok(StageStatus::Ran)
  }
}
