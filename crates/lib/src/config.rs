//! Pipeline configuration.
//!
//! Defaults reproduce the stock layout. A `scissors.toml` in the build root
//! may override the download locations, the project generators, the consuming
//! project directory and the cache mode.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cache::CacheMode;
use crate::consts::{DEFAULT_CEF_URL, DEFAULT_DEPS_URL, DEFAULT_OBS_REPOSITORY};
use crate::paths::config_path;
use crate::stage::Generator;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("invalid configuration in {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: Box<toml::de::Error>,
  },
}

/// Generators for each native sub-project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Generators {
  /// Primary framework.
  pub framework: Option<Generator>,
  /// Embedded browser wrapper.
  pub browser: Option<Generator>,
  /// Consuming project.
  pub consumer: Option<Generator>,
}

impl Default for Generators {
  #[cfg(windows)]
  fn default() -> Self {
    Self {
      framework: Some(Generator::new("Visual Studio 16 2019").with_platform("x64")),
      browser: Some(Generator::new("Visual Studio 16 2019").with_platform("x64")),
      consumer: Some(Generator::new("Visual Studio 15 2017 Win64")),
    }
  }

  /// Outside Windows the build system picks its own default generator.
  #[cfg(not(windows))]
  fn default() -> Self {
    Self {
      framework: None,
      browser: None,
      consumer: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
  /// Prebuilt dependency bundle.
  pub deps_url: String,
  /// Directory inside the dependency bundle passed to the framework build.
  pub deps_subdir: PathBuf,
  /// Framework source repository.
  pub obs_repository: String,
  /// Browser SDK archive, only fetched with the browser feature.
  pub cef_url: String,
  /// Consuming project, relative to the build root.
  pub consumer_dir: PathBuf,
  pub cache: CacheMode,
  pub generators: Generators,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      deps_url: DEFAULT_DEPS_URL.to_string(),
      deps_subdir: PathBuf::from("win64"),
      obs_repository: DEFAULT_OBS_REPOSITORY.to_string(),
      cef_url: DEFAULT_CEF_URL.to_string(),
      consumer_dir: PathBuf::from("."),
      cache: CacheMode::default(),
      generators: Generators::default(),
    }
  }
}

impl BuildConfig {
  /// Load `scissors.toml` from the root, falling back to defaults when absent.
  pub fn load(root: &Path) -> Result<Self, ConfigError> {
    let path = config_path(root);
    if !path.exists() {
      debug!(path = ?path, "no configuration file, using defaults");
      return Ok(Self::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
      path: path.clone(),
      source,
    })?;
    let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
      path: path.clone(),
      source: Box::new(source),
    })?;

    debug!(path = ?path, "loaded configuration");
    Ok(config)
  }

  pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(content)
  }
}
