//! Stage definitions and the errors a stage can fail with.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::STAGE_COMPLETE_MARKER;

/// Identifies a stage. Later stages refer to earlier outputs by this id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StageId(pub String);

impl StageId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for StageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// One unit of the pipeline.
///
/// `output` is the directory whose completion marks the stage as done. For
/// build stages it is also the build directory the tools run in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
  pub id: StageId,
  pub output: PathBuf,
  pub kind: StageKind,
}

impl Stage {
  pub fn new(id: impl Into<String>, output: impl Into<PathBuf>, kind: StageKind) -> Self {
    Self {
      id: StageId::new(id),
      output: output.into(),
      kind,
    }
  }

  pub fn is_acquisition(&self) -> bool {
    matches!(self.kind, StageKind::Archive(_) | StageKind::Clone(_))
  }

  /// Location of this stage's completion marker.
  ///
  /// Checkouts and collected runtime directories are consumed as-is by other
  /// tools, so their marker sits beside the directory (`<output>.scissors-complete`).
  /// Every other marker lives inside the output.
  pub fn marker_path(&self) -> PathBuf {
    match self.kind {
      StageKind::Clone(_) | StageKind::Collect(_) => {
        let mut name = self.output.file_name().unwrap_or_default().to_os_string();
        name.push(STAGE_COMPLETE_MARKER);
        self.output.with_file_name(name)
      }
      StageKind::Archive(_) | StageKind::Build(_) => self.output.join(STAGE_COMPLETE_MARKER),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageKind {
  /// Download an archive and extract it into the output directory.
  Archive(ArchiveSource),
  /// Clone a repository into the output directory.
  Clone(CloneSource),
  /// Generate and compile a native sub-project inside the output directory.
  Build(BuildSpec),
  /// Copy a runtime directory produced by an earlier stage.
  Collect(CollectSpec),
}

impl StageKind {
  pub fn label(&self) -> &'static str {
    match self {
      StageKind::Archive(_) => "acquire-archive",
      StageKind::Clone(_) => "acquire-source",
      StageKind::Build(_) => "build",
      StageKind::Collect(_) => "collect",
    }
  }

  /// Position in the fixed pipeline order: acquisitions, builds, collection.
  pub(crate) fn phase(&self) -> u8 {
    match self {
      StageKind::Archive(_) | StageKind::Clone(_) => 0,
      StageKind::Build(_) => 1,
      StageKind::Collect(_) => 2,
    }
  }

  /// Stages whose outputs this stage reads.
  pub fn dependencies(&self) -> Vec<&StageId> {
    match self {
      StageKind::Archive(_) | StageKind::Clone(_) => Vec::new(),
      StageKind::Build(spec) => spec
        .configure
        .iter()
        .filter_map(|arg| match &arg.value {
          ConfigValue::Dependency(dep) => Some(&dep.stage),
          ConfigValue::Literal(_) => None,
        })
        .collect(),
      StageKind::Collect(spec) => vec![&spec.source.stage],
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
  Zip,
  TarGz,
  /// Extracted by the external `7z` tool.
  SevenZip,
}

impl ArchiveFormat {
  /// Infer the format from the URL's file extension.
  pub fn from_url(url: &str) -> Option<Self> {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    if path.ends_with(".zip") {
      Some(ArchiveFormat::Zip)
    } else if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
      Some(ArchiveFormat::TarGz)
    } else if path.ends_with(".7z") {
      Some(ArchiveFormat::SevenZip)
    } else {
      None
    }
  }

  /// Whether extraction needs an external tool rather than an in-process decoder.
  pub fn is_external(self) -> bool {
    matches!(self, ArchiveFormat::SevenZip)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSource {
  pub url: String,
  pub format: ArchiveFormat,
  /// Leading path components dropped from every extracted entry.
  pub strip_components: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneSource {
  pub url: String,
  /// Also fetch nested sub-repositories.
  pub recursive: bool,
}

/// Project generator passed to the native build system (`-G`, `-A`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Generator {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub platform: Option<String>,
}

impl Generator {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      platform: None,
    }
  }

  pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
    self.platform = Some(platform.into());
    self
  }
}

/// Reference to the output of an earlier stage, optionally below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
  pub stage: StageId,
  pub subpath: Option<PathBuf>,
}

impl DependencyRef {
  pub fn new(stage: impl Into<String>) -> Self {
    Self {
      stage: StageId::new(stage),
      subpath: None,
    }
  }

  pub fn join(mut self, subpath: impl Into<PathBuf>) -> Self {
    self.subpath = Some(subpath.into());
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
  Literal(String),
  Dependency(DependencyRef),
}

/// One `-D<key>=<value>` argument of the generate step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureArg {
  pub key: String,
  pub value: ConfigValue,
}

impl ConfigureArg {
  pub fn literal(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      value: ConfigValue::Literal(value.into()),
    }
  }

  pub fn dependency(key: impl Into<String>, dep: DependencyRef) -> Self {
    Self {
      key: key.into(),
      value: ConfigValue::Dependency(dep),
    }
  }
}

/// A native sub-project build.
///
/// The configuration label given to the compile step is carried separately
/// from the generate-step arguments; sub-projects do not always spell them the
/// same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
  pub project_dir: PathBuf,
  pub generator: Option<Generator>,
  pub configure: Vec<ConfigureArg>,
  pub compile_label: String,
  pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSpec {
  pub source: DependencyRef,
}

/// Absolute output paths of the stages processed so far, by stage id.
#[derive(Debug, Clone, Default)]
pub struct DependencyPaths {
  paths: BTreeMap<StageId, PathBuf>,
}

impl DependencyPaths {
  pub fn insert(&mut self, stage: StageId, path: PathBuf) {
    self.paths.insert(stage, path);
  }

  pub fn get(&self, stage: &StageId) -> Option<&Path> {
    self.paths.get(stage).map(PathBuf::as_path)
  }

  pub fn resolve(&self, dep: &DependencyRef) -> Result<PathBuf, StageError> {
    let base = self
      .get(&dep.stage)
      .ok_or_else(|| StageError::UnresolvedDependency(dep.stage.clone()))?;
    Ok(match &dep.subpath {
      Some(subpath) => base.join(subpath),
      None => base.to_path_buf(),
    })
  }
}

/// Failure categories reported across the pipeline boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
  Network,
  Extraction,
  ExternalTool,
  Filesystem,
  Configuration,
}

impl fmt::Display for ErrorCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ErrorCategory::Network => "network failure",
      ErrorCategory::Extraction => "extraction failure",
      ErrorCategory::ExternalTool => "external tool failure",
      ErrorCategory::Filesystem => "filesystem failure",
      ErrorCategory::Configuration => "configuration failure",
    })
  }
}

/// Errors that can occur while executing a stage.
#[derive(Debug, Error)]
pub enum StageError {
  /// The download could not complete.
  #[error("download failed for {url}: {message}")]
  Network { url: String, message: String },

  /// The archive is corrupt or the extractor failed.
  #[error("failed to extract {}: {message}", archive.display())]
  Extraction { archive: PathBuf, message: String },

  /// An external tool exited non-zero.
  #[error("command failed with exit code {code:?}: {command}")]
  ExternalTool { command: String, code: Option<i32> },

  /// An external tool could not be started.
  #[error("failed to launch {command}: {source}")]
  Launch {
    command: String,
    #[source]
    source: io::Error,
  },

  /// A directory could not be created, copied or removed.
  #[error("failed to {action} {}: {source}", path.display())]
  Filesystem {
    action: &'static str,
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A stage referenced an output that no earlier stage produced.
  #[error("unresolved dependency on stage '{0}'")]
  UnresolvedDependency(StageId),
}

impl StageError {
  pub fn category(&self) -> ErrorCategory {
    match self {
      StageError::Network { .. } => ErrorCategory::Network,
      StageError::Extraction { .. } => ErrorCategory::Extraction,
      StageError::ExternalTool { .. } | StageError::Launch { .. } => ErrorCategory::ExternalTool,
      StageError::Filesystem { .. } => ErrorCategory::Filesystem,
      StageError::UnresolvedDependency(_) => ErrorCategory::Configuration,
    }
  }

  pub(crate) fn fs(action: &'static str, path: &Path, source: io::Error) -> Self {
    StageError::Filesystem {
      action,
      path: path.to_path_buf(),
      source,
    }
  }
}
