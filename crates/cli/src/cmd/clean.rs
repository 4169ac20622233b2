use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use scissors_lib::clean::{CleanOptions, clean};
use scissors_lib::config::BuildConfig;
use scissors_lib::paths::root_dir;
use scissors_lib::pipeline::every_variant_stages;

use crate::output::{OutputFormat, format_bytes, format_duration, print_info, print_json, print_stat, print_success};

pub fn cmd_clean(root: Option<&Path>, clean_src: bool, dry_run: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();

  let root = root_dir(root).context("Failed to resolve build root")?;
  let config = BuildConfig::load(&root)?;
  let stages = every_variant_stages(&root, &config).context("Invalid pipeline")?;

  let options = CleanOptions {
    remove_acquired_sources: clean_src,
    dry_run,
  };
  let report = clean(&stages, options)?;

  if output.is_json() {
    print_json(&report)?;
  } else {
    for path in &report.removed {
      print_info(&path.display().to_string());
    }
    println!();
    if dry_run {
      print_info("Dry run - no changes made");
    } else {
      print_success("Clean complete!");
    }
    print_stat("Directories removed", &report.removed.len().to_string());
    print_stat("Space freed", &format_bytes(report.bytes_freed));
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}
