//! Pipeline stages and their executors.

pub mod acquire;
pub mod archive;
pub mod build;
pub mod collect;
mod types;

pub use acquire::{Downloader, HttpDownloader};
pub use types::{
  ArchiveFormat, ArchiveSource, BuildSpec, CloneSource, CollectSpec, ConfigValue, ConfigureArg, DependencyPaths,
  DependencyRef, ErrorCategory, Generator, Stage, StageError, StageId, StageKind,
};
