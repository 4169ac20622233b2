//! Build variants.
//!
//! A variant is the single configuration axis of a pipeline run: the build
//! profile plus the optional subsystems compiled into the framework.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Debug or release build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
  Debug,
  #[default]
  Release,
}

impl Profile {
  /// Every profile, used when an operation must cover all variants.
  pub const ALL: [Profile; 2] = [Profile::Debug, Profile::Release];

  /// Configuration label understood by the native build system.
  ///
  /// Also names the collected output directory (`build/<label>`).
  pub fn label(self) -> &'static str {
    match self {
      Profile::Debug => "Debug",
      Profile::Release => "Release",
    }
  }

  pub fn is_debug(self) -> bool {
    matches!(self, Profile::Debug)
  }
}

impl fmt::Display for Profile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Optional subsystems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Features {
  /// Embedded browser component. Pulls in the browser SDK and builds its wrapper.
  pub browser: bool,
  /// Caption/transcription support.
  pub captions: bool,
}

impl Features {
  pub fn all() -> Self {
    Self {
      browser: true,
      captions: true,
    }
  }
}

/// The active variant of a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildVariant {
  pub profile: Profile,
  pub features: Features,
}

impl BuildVariant {
  pub fn new(profile: Profile, features: Features) -> Self {
    Self { profile, features }
  }

  /// Name of the collected output directory for this variant.
  pub fn output_dir_name(&self) -> &'static str {
    self.profile.label()
  }
}

impl fmt::Display for BuildVariant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.profile)?;
    if self.features.browser {
      write!(f, "+browser")?;
    }
    if self.features.captions {
      write!(f, "+captions")?;
    }
    Ok(())
  }
}

/// CMake-style boolean toggle.
pub fn toggle(enabled: bool) -> &'static str {
  if enabled { "ON" } else { "OFF" }
}
