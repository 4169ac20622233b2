//! In-process archive extraction.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::stage::{ArchiveFormat, StageError};

/// Unpack `archive_path` into `dest`, dropping `strip` leading path components.
///
/// Only formats with an in-process decoder are accepted here.
pub fn unpack_archive(archive_path: &Path, dest: &Path, format: ArchiveFormat, strip: usize) -> Result<(), StageError> {
  fs::create_dir_all(dest).map_err(|e| StageError::fs("create", dest, e))?;

  let result = match format {
    ArchiveFormat::Zip => unpack_zip(archive_path, dest, strip),
    ArchiveFormat::TarGz => unpack_tar_gz(archive_path, dest, strip),
    ArchiveFormat::SevenZip => Err(format!("{:?} archives need an external extractor", format)),
  };

  result.map_err(|message| StageError::Extraction {
    archive: archive_path.to_path_buf(),
    message,
  })?;

  debug!(archive = ?archive_path, dest = ?dest, "unpacked archive");
  Ok(())
}

fn strip_path(path: &Path, strip: usize) -> Option<PathBuf> {
  let stripped: PathBuf = path.components().skip(strip).collect();
  if stripped.as_os_str().is_empty() {
    None
  } else {
    Some(stripped)
  }
}

fn unpack_tar_gz(archive_path: &Path, dest: &Path, strip: usize) -> Result<(), String> {
  let file = File::open(archive_path).map_err(|e| e.to_string())?;
  let decoder = GzDecoder::new(BufReader::new(file));
  let mut archive = Archive::new(decoder);

  for entry in archive.entries().map_err(|e| e.to_string())? {
    let mut entry = entry.map_err(|e| e.to_string())?;
    let path = entry.path().map_err(|e| e.to_string())?.into_owned();

    let Some(stripped) = strip_path(&path, strip) else {
      continue;
    };

    if stripped.components().any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))) {
      return Err(format!("entry escapes destination: {}", path.display()));
    }

    let dest_path = dest.join(&stripped);
    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    entry.unpack(&dest_path).map_err(|e| e.to_string())?;
  }

  Ok(())
}

fn unpack_zip(archive_path: &Path, dest: &Path, strip: usize) -> Result<(), String> {
  let file = File::open(archive_path).map_err(|e| e.to_string())?;
  let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| format!("failed to open zip: {}", e))?;

  for i in 0..archive.len() {
    let mut file = archive
      .by_index(i)
      .map_err(|e| format!("failed to read zip entry: {}", e))?;

    let path = file
      .enclosed_name()
      .ok_or_else(|| format!("invalid zip entry name: {}", file.name()))?;

    let Some(stripped) = strip_path(&path, strip) else {
      continue;
    };

    let dest_path = dest.join(&stripped);

    if file.is_dir() {
      fs::create_dir_all(&dest_path).map_err(|e| e.to_string())?;
    } else {
      if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
      }

      let mut outfile = File::create(&dest_path).map_err(|e| e.to_string())?;
      std::io::copy(&mut file, &mut outfile).map_err(|e| e.to_string())?;

      #[cfg(unix)]
      {
        use std::os::unix::fs::PermissionsExt;
        if let Some(mode) = file.unix_mode() {
          fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode)).map_err(|e| e.to_string())?;
        }
      }
    }
  }

  Ok(())
}

/// Replace `dest`'s single top-level directory by its contents, `levels` times.
///
/// Used after external extraction, where the tool cannot strip components.
pub fn hoist_single_root(dest: &Path, levels: usize) -> Result<(), StageError> {
  for _ in 0..levels {
    let entries: Vec<PathBuf> = fs::read_dir(dest)
      .map_err(|e| StageError::fs("read", dest, e))?
      .filter_map(|entry| entry.ok().map(|e| e.path()))
      .collect();

    let root = match entries.as_slice() {
      [only] if only.is_dir() => only.clone(),
      _ => {
        return Err(StageError::Extraction {
          archive: dest.to_path_buf(),
          message: format!("expected a single top-level directory, found {} entries", entries.len()),
        });
      }
    };

    // Move the wrapper aside first so a child with the same name cannot collide with it.
    let staging = dest.join(".scissors-hoist");
    fs::rename(&root, &staging).map_err(|e| StageError::fs("move", &root, e))?;

    for entry in fs::read_dir(&staging).map_err(|e| StageError::fs("read", &staging, e))? {
      let entry = entry.map_err(|e| StageError::fs("read", &staging, e))?;
      let target = dest.join(entry.file_name());
      fs::rename(entry.path(), &target).map_err(|e| StageError::fs("move", &entry.path(), e))?;
    }

    fs::remove_dir(&staging).map_err(|e| StageError::fs("remove", &staging, e))?;
  }

  Ok(())
}
