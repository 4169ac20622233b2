//! Build root resolution.
//!
//! Every stage output lives under a single build root. The root is taken from
//! an explicit override, then `SCISSORS_ROOT`, then the current directory.

use std::io;
use std::path::{Path, PathBuf};

use crate::consts::{CONFIG_FILENAME, ROOT_ENV};

/// Resolve the build root to an absolute path.
///
/// Paths handed to external tools must be absolute because each tool runs in
/// its own working directory.
pub fn root_dir(explicit: Option<&Path>) -> io::Result<PathBuf> {
  let root = match explicit {
    Some(path) => path.to_path_buf(),
    None => match std::env::var_os(ROOT_ENV) {
      Some(value) if !value.is_empty() => PathBuf::from(value),
      _ => std::env::current_dir()?,
    },
  };

  if root.exists() {
    return dunce::canonicalize(&root);
  }

  if root.is_absolute() {
    Ok(root)
  } else {
    Ok(std::env::current_dir()?.join(root))
  }
}

/// Location of the optional configuration file for a root.
pub fn config_path(root: &Path) -> PathBuf {
  root.join(CONFIG_FILENAME)
}
