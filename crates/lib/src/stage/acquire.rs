//! Acquisition stages: archive downloads and source clones.
//!
//! No integrity verification is performed on downloads; the remote host is
//! trusted.

use std::future::Future;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::consts::APP_NAME;
use crate::process::{Invocation, ProcessRunner, path_arg, run_checked};
use crate::stage::archive::{hoist_single_root, unpack_archive};
use crate::stage::{ArchiveFormat, ArchiveSource, CloneSource, StageError};

/// Fetches a URL into a local file.
pub trait Downloader {
  /// Download `url` to `dest`, returning the number of bytes written.
  fn download(&self, url: &str, dest: &Path) -> impl Future<Output = Result<u64, StageError>>;
}

/// Downloads over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpDownloader {
  client: reqwest::Client,
}

impl HttpDownloader {
  pub fn new() -> Result<Self, StageError> {
    let client = reqwest::Client::builder()
      .user_agent(format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| StageError::Network {
        url: String::new(),
        message: e.to_string(),
      })?;
    Ok(Self { client })
  }
}

impl Downloader for HttpDownloader {
  async fn download(&self, url: &str, dest: &Path) -> Result<u64, StageError> {
    let network = |message: String| StageError::Network {
      url: url.to_string(),
      message,
    };

    let mut response = self.client.get(url).send().await.map_err(|e| network(e.to_string()))?;

    if !response.status().is_success() {
      return Err(network(format!("HTTP {}", response.status())));
    }

    let mut file = tokio::fs::File::create(dest)
      .await
      .map_err(|e| StageError::fs("create", dest, e))?;

    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|e| network(e.to_string()))? {
      file
        .write_all(&chunk)
        .await
        .map_err(|e| StageError::fs("write", dest, e))?;
      written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| StageError::fs("write", dest, e))?;

    Ok(written)
  }
}

/// Download an archive to a temporary file and extract it into `dest`.
pub async fn download_archive<R, D>(
  source: &ArchiveSource,
  dest: &Path,
  runner: &R,
  downloader: &D,
) -> Result<(), StageError>
where
  R: ProcessRunner,
  D: Downloader,
{
  tokio::fs::create_dir_all(dest)
    .await
    .map_err(|e| StageError::fs("create", dest, e))?;

  let temp = tempfile::Builder::new()
    .prefix("scissors-")
    .tempdir()
    .map_err(|e| StageError::fs("create", &std::env::temp_dir(), e))?;
  let archive_path = temp.path().join(url_to_filename(&source.url));

  info!(url = %source.url, "downloading");
  let size = downloader.download(&source.url, &archive_path).await?;
  debug!(path = ?archive_path, size, "download complete");

  info!(archive = ?archive_path, dest = ?dest, "extracting");
  if source.format.is_external() {
    extract_external(source.format, &archive_path, dest, runner).await?;
    hoist_single_root(dest, source.strip_components)?;
  } else {
    unpack_archive(&archive_path, dest, source.format, source.strip_components)?;
  }

  Ok(())
}

/// Extract with an external archiving tool. A non-zero exit is an extraction failure.
async fn extract_external<R: ProcessRunner>(
  format: ArchiveFormat,
  archive: &Path,
  dest: &Path,
  runner: &R,
) -> Result<(), StageError> {
  let invocation = match format {
    ArchiveFormat::SevenZip => Invocation::new("7z", dest).args([
      "x".to_string(),
      path_arg(archive),
      format!("-o{}", path_arg(dest)),
      "-y".to_string(),
    ]),
    ArchiveFormat::Zip | ArchiveFormat::TarGz => {
      return Err(StageError::Extraction {
        archive: archive.to_path_buf(),
        message: format!("{:?} archives are extracted in-process", format),
      });
    }
  };

  run_checked(runner, &invocation).await.map_err(|e| match e {
    StageError::ExternalTool { command, code } => StageError::Extraction {
      archive: archive.to_path_buf(),
      message: format!("command failed with exit code {:?}: {}", code, command),
    },
    other => other,
  })
}

/// Clone a repository into `dest`.
pub async fn clone_source<R: ProcessRunner>(source: &CloneSource, dest: &Path, runner: &R) -> Result<(), StageError> {
  let parent = match dest.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
    _ => std::env::current_dir().map_err(|e| StageError::fs("read", dest, e))?,
  };
  tokio::fs::create_dir_all(&parent)
    .await
    .map_err(|e| StageError::fs("create", &parent, e))?;

  let mut invocation = Invocation::new("git", &parent).arg("clone");
  if source.recursive {
    invocation = invocation.arg("--recursive");
  }
  let invocation = invocation.arg(source.url.as_str()).arg(path_arg(dest));

  info!(url = %source.url, dest = ?dest, recursive = source.recursive, "cloning");
  run_checked(runner, &invocation).await
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component and sanitizes it. Falls back to hash of URL
/// if no suitable filename can be extracted.
fn url_to_filename(url: &str) -> String {
  if let Some(filename) = url.rsplit('/').next() {
    let filename = filename.split('?').next().unwrap_or(filename);

    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return sanitized;
    }
  }

  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  format!("download_{}", &hex::encode(hasher.finalize())[..16])
}
