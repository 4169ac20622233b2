//! Native sub-project builds.
//!
//! A build is two external invocations run inside the build directory:
//! project generation, then compilation. Compilation never starts if
//! generation failed.

use std::path::Path;

use tracing::info;

use crate::process::{Invocation, ProcessRunner, path_arg, run_checked};
use crate::stage::{BuildSpec, ConfigValue, DependencyPaths, StageError};

/// Build-system executable.
const CMAKE: &str = "cmake";

/// Generate-step invocation with every configure argument resolved.
pub fn generate_invocation(
  spec: &BuildSpec,
  build_dir: &Path,
  deps: &DependencyPaths,
) -> Result<Invocation, StageError> {
  let mut invocation = Invocation::new(CMAKE, build_dir).arg(path_arg(&spec.project_dir));

  if let Some(generator) = &spec.generator {
    invocation = invocation.args(["-G", generator.name.as_str()]);
    if let Some(platform) = &generator.platform {
      invocation = invocation.args(["-A", platform.as_str()]);
    }
  }

  for arg in &spec.configure {
    let value = match &arg.value {
      ConfigValue::Literal(value) => value.clone(),
      ConfigValue::Dependency(dep) => path_arg(&deps.resolve(dep)?),
    };
    invocation = invocation.arg(format!("-D{}={}", arg.key, value));
  }

  Ok(invocation)
}

/// Compile-step invocation.
pub fn compile_invocation(spec: &BuildSpec, build_dir: &Path) -> Invocation {
  let invocation = Invocation::new(CMAKE, build_dir).args(["--build", ".", "--config", spec.compile_label.as_str()]);
  match &spec.target {
    Some(target) => invocation.args(["--target", target.as_str()]),
    None => invocation,
  }
}

/// Create `build_dir`, then generate and compile the project inside it.
pub async fn build_project<R: ProcessRunner>(
  spec: &BuildSpec,
  build_dir: &Path,
  deps: &DependencyPaths,
  runner: &R,
) -> Result<(), StageError> {
  // Resolve before touching the filesystem so a bad reference leaves nothing behind.
  let generate = generate_invocation(spec, build_dir, deps)?;
  let compile = compile_invocation(spec, build_dir);

  tokio::fs::create_dir_all(build_dir)
    .await
    .map_err(|e| StageError::fs("create", build_dir, e))?;

  info!(project = ?spec.project_dir, build_dir = ?build_dir, "generating project");
  run_checked(runner, &generate).await?;

  info!(build_dir = ?build_dir, config = %spec.compile_label, "compiling project");
  run_checked(runner, &compile).await
}
