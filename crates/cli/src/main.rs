mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scissors_lib::consts::ROOT_ENV;
use scissors_lib::variant::{BuildVariant, Features, Profile};

use crate::output::{OutputFormat, print_error};

/// scissors - staged native build orchestrator
#[derive(Parser)]
#[command(name = "scissors")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Build root holding every stage output (default: current directory)
  #[arg(long, global = true, env = ROOT_ENV)]
  root: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Acquire dependencies and build every stage of the selected variant
  Build {
    #[command(flatten)]
    variant: VariantArgs,
  },

  /// Remove build outputs of every variant
  Clean {
    /// Also remove downloaded dependencies and cloned sources
    #[arg(long)]
    clean_src: bool,

    /// Show what would be removed without removing anything
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },

  /// Show which stages of the selected variant are complete
  Status {
    #[command(flatten)]
    variant: VariantArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
  },
}

#[derive(Args, Debug, Clone, Copy)]
struct VariantArgs {
  /// Build the debug profile (default when PROFILE=debug)
  #[arg(long)]
  debug: bool,

  /// Include the embedded browser component
  #[arg(long)]
  browser: bool,

  /// Include caption support
  #[arg(long)]
  captions: bool,
}

impl VariantArgs {
  fn resolve(self) -> BuildVariant {
    let debug = self.debug || std::env::var("PROFILE").is_ok_and(|p| p == "debug");
    let profile = if debug { Profile::Debug } else { Profile::Release };
    BuildVariant::new(
      profile,
      Features {
        browser: self.browser,
        captions: self.captions,
      },
    )
  }
}

/// Filter for `--verbose`: debug events from the library and this binary.
fn verbose_directives() -> String {
  format!("scissors_lib=debug,{}=debug", env!("CARGO_CRATE_NAME"))
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new(verbose_directives())
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let root = cli.root.as_deref();
  let result = match cli.command {
    Commands::Build { variant } => cmd::cmd_build(root, variant.resolve()),
    Commands::Clean {
      clean_src,
      dry_run,
      output,
    } => cmd::cmd_clean(root, clean_src, dry_run, output),
    Commands::Status { variant, output } => cmd::cmd_status(root, variant.resolve(), output),
  };

  if let Err(e) = result {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verbose_filter_covers_binary_events() {
    let directives = verbose_directives();
    let own_target = module_path!().split("::").next().unwrap();

    assert_eq!(own_target, "scissors");
    assert!(directives.split(',').any(|d| d == format!("{}=debug", own_target)));
    assert!(directives.contains("scissors_lib=debug"));
    assert!(directives.parse::<EnvFilter>().is_ok());
  }
}
