//! External command invocation.
//!
//! Every external tool the pipeline drives (version control, archive
//! extraction, the native build system) goes through [`ProcessRunner`]. The
//! runner blocks until the child exits and reports its exit code. Output is
//! not captured: the child inherits the orchestrator's standard streams.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::stage::StageError;

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  pub cwd: PathBuf,
  /// Route the command through the platform shell.
  pub use_platform_shell: bool,
}

impl Invocation {
  /// Create an invocation running in `cwd`.
  ///
  /// The platform shell is used by default on Windows only, where several
  /// build tools are batch wrappers that cannot be spawned directly.
  pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: cwd.into(),
      use_platform_shell: cfg!(windows),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn platform_shell(mut self, enabled: bool) -> Self {
    self.use_platform_shell = enabled;
    self
  }

  /// Command line for log and error messages.
  pub fn command_line(&self) -> String {
    let mut line = self.program.clone();
    for arg in &self.args {
      line.push(' ');
      if arg.is_empty() || arg.contains(char::is_whitespace) {
        line.push('"');
        line.push_str(arg);
        line.push('"');
      } else {
        line.push_str(arg);
      }
    }
    line
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.command_line())
  }
}

/// Exit code of a finished process. `None` when it was terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit(pub Option<i32>);

impl ProcessExit {
  pub const SUCCESS: ProcessExit = ProcessExit(Some(0));

  pub fn code(&self) -> Option<i32> {
    self.0
  }

  pub fn success(&self) -> bool {
    self.0 == Some(0)
  }
}

#[derive(Debug, Error)]
pub enum RunError {
  #[error("failed to spawn {command}: {source}")]
  Spawn {
    command: String,
    #[source]
    source: std::io::Error,
  },
}

/// Runs external commands to completion.
pub trait ProcessRunner {
  fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<ProcessExit, RunError>>;
}

/// Run an invocation and turn a non-zero exit into a stage failure.
pub async fn run_checked<R: ProcessRunner>(runner: &R, invocation: &Invocation) -> Result<(), StageError> {
  let exit = runner.run(invocation).await.map_err(|e| match e {
    RunError::Spawn { command, source } => StageError::Launch { command, source },
  })?;

  if !exit.success() {
    return Err(StageError::ExternalTool {
      command: invocation.command_line(),
      code: exit.code(),
    });
  }

  Ok(())
}

/// Runs commands as child processes of the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
  shell: Option<String>,
}

impl SystemRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use a specific shell for invocations that request the platform shell.
  pub fn with_shell(shell: impl Into<String>) -> Self {
    Self {
      shell: Some(shell.into()),
    }
  }

  fn command(&self, invocation: &Invocation) -> Command {
    if !invocation.use_platform_shell {
      let mut command = Command::new(&invocation.program);
      command.args(&invocation.args);
      return command;
    }

    let (shell, shell_args) = get_shell(self.shell.as_deref());
    let mut command = Command::new(shell);
    command.args(shell_args).arg(&invocation.program).args(&invocation.args);
    command
  }
}

impl ProcessRunner for SystemRunner {
  async fn run(&self, invocation: &Invocation) -> Result<ProcessExit, RunError> {
    debug!(
      cmd = %invocation,
      cwd = ?invocation.cwd,
      shell = invocation.use_platform_shell,
      "spawning process"
    );

    let status = self
      .command(invocation)
      .current_dir(&invocation.cwd)
      .status()
      .await
      .map_err(|source| RunError::Spawn {
        command: invocation.command_line(),
        source,
      })?;

    debug!(cmd = %invocation, code = ?status.code(), "process exited");
    Ok(ProcessExit(status.code()))
  }
}

/// Get the shell command and the arguments that precede the program.
///
/// On Unix the program and its arguments are handed to the shell as
/// positional parameters, so no quoting is needed.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string(), "exec \"$0\" \"$@\"".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string(), "exec \"$0\" \"$@\"".to_string()])
  }

  #[cfg(windows)]
  {
    ("cmd.exe".to_string(), vec!["/C".to_string()])
  }
}

/// Absolute path rendered for a command-line argument.
pub(crate) fn path_arg(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}
