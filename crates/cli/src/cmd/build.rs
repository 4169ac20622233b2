//! Implementation of the `scissors build` command.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::debug;

use scissors_lib::config::BuildConfig;
use scissors_lib::paths::root_dir;
use scissors_lib::pipeline::{PipelineBuilder, StageStatus};
use scissors_lib::process::SystemRunner;
use scissors_lib::stage::HttpDownloader;
use scissors_lib::variant::BuildVariant;

use crate::output::{format_duration, print_error, print_info, print_skipped, print_stat, print_success};

/// Execute the build command.
///
/// Runs every stage of the variant in order, skipping the ones whose output is
/// already complete. Exits with status 1 after printing the failed stage.
pub fn cmd_build(root: Option<&Path>, variant: BuildVariant) -> Result<()> {
  let start = Instant::now();

  let root = root_dir(root).context("Failed to resolve build root")?;
  let config = BuildConfig::load(&root)?;
  let pipeline = PipelineBuilder::new(&root, &config)
    .variant(variant)
    .build()
    .context("Invalid pipeline")?;
  debug!(root = ?root, variant = %variant, stages = pipeline.stages().len(), "pipeline assembled");

  print_info(&format!("Building {} in {}", variant, root.display()));

  let runner = SystemRunner::new();
  let downloader = HttpDownloader::new().context("Failed to create HTTP client")?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(pipeline.run(&runner, &downloader));

  for outcome in &report.outcomes {
    match outcome.status {
      StageStatus::Ran => print_success(outcome.stage.as_str()),
      StageStatus::Skipped => print_skipped(&format!("{} (up to date)", outcome.stage)),
    }
  }

  println!();
  if let Some(failure) = &report.failure {
    print_error(&format!(
      "Stage '{}' failed ({}): {}",
      failure.stage, failure.category, failure.message
    ));
    print_stat("Stages run", &report.ran().to_string());
    print_stat("Duration", &format_duration(start.elapsed()));
    std::process::exit(report.exit_code());
  }

  print_success("Build complete!");
  print_stat("Stages run", &report.ran().to_string());
  print_stat("Stages skipped", &report.skipped().to_string());
  print_stat(
    "Output",
    &root.join("build").join(variant.output_dir_name()).display().to_string(),
  );
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
