//! Assembles the stage list for a build variant.
//!
//! Layout below the root:
//!
//! ```text
//! deps/                 dependency bundle (archive)
//! cef/                  browser SDK (archive, browser feature)
//! obs-studio/           framework sources (recursive clone)
//! cef/build/            browser wrapper build (browser feature)
//! obs-studio/build/     framework build
//! cbuild/               consuming project build
//! build/<Debug|Release> collected runtime directory
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::pipeline::{Pipeline, PipelineError};
use crate::stage::{
  ArchiveFormat, ArchiveSource, BuildSpec, CloneSource, CollectSpec, ConfigureArg, DependencyRef, Stage, StageKind,
};
use crate::variant::{BuildVariant, Features, Profile, toggle};

pub const DEPS: &str = "deps";
pub const CEF: &str = "cef";
pub const OBS: &str = "obs-studio";
pub const CEF_BUILD: &str = "cef-build";
pub const OBS_BUILD: &str = "obs-build";
pub const CONSUMER_BUILD: &str = "consumer-build";
pub const ARTIFACTS: &str = "artifacts";

/// Browser SDK target built by the wrapper stage.
const CEF_WRAPPER_TARGET: &str = "libcef_dll_wrapper";

pub struct PipelineBuilder<'a> {
  root: PathBuf,
  config: &'a BuildConfig,
  variant: BuildVariant,
}

impl<'a> PipelineBuilder<'a> {
  pub fn new(root: &Path, config: &'a BuildConfig) -> Self {
    Self {
      root: root.to_path_buf(),
      config,
      variant: BuildVariant::default(),
    }
  }

  pub fn variant(mut self, variant: BuildVariant) -> Self {
    self.variant = variant;
    self
  }

  /// The ordered stages of the selected variant.
  pub fn stages(&self) -> Result<Vec<Stage>, PipelineError> {
    let root = &self.root;
    let config = self.config;
    let label = self.variant.profile.label();
    let features = self.variant.features;

    let mut stages = vec![Stage::new(
      DEPS,
      root.join("deps"),
      StageKind::Archive(archive_source(&config.deps_url, 0)?),
    )];

    if features.browser {
      stages.push(Stage::new(
        CEF,
        root.join("cef"),
        StageKind::Archive(archive_source(&config.cef_url, 1)?),
      ));
    }

    stages.push(Stage::new(
      OBS,
      root.join("obs-studio"),
      StageKind::Clone(CloneSource {
        url: config.obs_repository.clone(),
        recursive: true,
      }),
    ));

    if features.browser {
      stages.push(Stage::new(
        CEF_BUILD,
        root.join("cef").join("build"),
        StageKind::Build(BuildSpec {
          project_dir: root.join("cef"),
          generator: config.generators.browser.clone(),
          configure: vec![ConfigureArg::literal("CMAKE_BUILD_TYPE", label)],
          compile_label: label.to_string(),
          target: Some(CEF_WRAPPER_TARGET.to_string()),
        }),
      ));
    }

    let mut framework_args = vec![
      ConfigureArg::literal("CMAKE_BUILD_TYPE", label),
      ConfigureArg::dependency("DepsPath", DependencyRef::new(DEPS).join(&config.deps_subdir)),
      ConfigureArg::literal("ENABLE_UI", "FALSE"),
      ConfigureArg::literal("DISABLE_UI", "TRUE"),
      ConfigureArg::literal("ENABLE_SCRIPTING", "FALSE"),
      ConfigureArg::literal("BUILD_BROWSER", toggle(features.browser)),
    ];
    if features.browser {
      framework_args.push(ConfigureArg::dependency("CEF_ROOT_DIR", DependencyRef::new(CEF)));
    }
    framework_args.push(ConfigureArg::literal("BUILD_CAPTIONS", toggle(features.captions)));

    stages.push(Stage::new(
      OBS_BUILD,
      root.join("obs-studio").join("build"),
      StageKind::Build(BuildSpec {
        project_dir: root.join("obs-studio"),
        generator: config.generators.framework.clone(),
        configure: framework_args,
        compile_label: label.to_string(),
        target: None,
      }),
    ));

    stages.push(Stage::new(
      CONSUMER_BUILD,
      root.join("cbuild"),
      StageKind::Build(BuildSpec {
        project_dir: root.join(&config.consumer_dir).components().collect(),
        generator: config.generators.consumer.clone(),
        configure: vec![
          ConfigureArg::literal("CMAKE_BUILD_TYPE", label),
          ConfigureArg::dependency("OBS_BUILD_DIR", DependencyRef::new(OBS_BUILD)),
          ConfigureArg::dependency("OBS_SOURCE_DIR", DependencyRef::new(OBS)),
        ],
        compile_label: label.to_string(),
        target: None,
      }),
    ));

    stages.push(Stage::new(
      ARTIFACTS,
      root.join("build").join(self.variant.output_dir_name()),
      StageKind::Collect(CollectSpec {
        source: DependencyRef::new(OBS_BUILD).join(Path::new("rundir").join(label)),
      }),
    ));

    Ok(stages)
  }

  pub fn build(&self) -> Result<Pipeline, PipelineError> {
    Pipeline::new(self.stages()?, self.config.cache)
  }
}

/// Stages of every profile with every feature enabled, one per output path.
///
/// Used by clean, which must never be scoped to the current variant.
pub fn every_variant_stages(root: &Path, config: &BuildConfig) -> Result<Vec<Stage>, PipelineError> {
  let mut seen = HashSet::new();
  let mut stages = Vec::new();

  for profile in Profile::ALL {
    let variant = BuildVariant::new(profile, Features::all());
    for stage in PipelineBuilder::new(root, config).variant(variant).stages()? {
      if seen.insert(stage.output.clone()) {
        stages.push(stage);
      }
    }
  }

  Ok(stages)
}

fn archive_source(url: &str, strip_components: usize) -> Result<ArchiveSource, PipelineError> {
  let format = ArchiveFormat::from_url(url).ok_or_else(|| PipelineError::UnsupportedArchive { url: url.to_string() })?;
  Ok(ArchiveSource {
    url: url.to_string(),
    format,
    strip_components,
  })
}
