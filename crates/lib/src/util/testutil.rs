//! Test utilities for scissors-lib.
//!
//! Fakes for the two external seams of the pipeline: a process runner that
//! records invocations (and can simulate what the real tools leave on disk)
//! and a downloader serving in-memory archives.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zip::write::SimpleFileOptions;

use crate::process::{Invocation, ProcessExit, ProcessRunner, RunError};
use crate::stage::{Downloader, StageError};

type Predicate = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;

/// Records every invocation instead of spawning it.
pub struct RecordingRunner {
  calls: Mutex<Vec<Invocation>>,
  fail_when: Option<Predicate>,
  simulate: bool,
}

impl RecordingRunner {
  pub fn new() -> Self {
    Self {
      calls: Mutex::new(Vec::new()),
      fail_when: None,
      simulate: false,
    }
  }

  /// Exit with code 1 for invocations matching `predicate`.
  pub fn fail_when(mut self, predicate: impl Fn(&Invocation) -> bool + Send + Sync + 'static) -> Self {
    self.fail_when = Some(Box::new(predicate));
    self
  }

  /// Create the files the real tools would produce.
  pub fn simulating(mut self) -> Self {
    self.simulate = true;
    self
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }
}

impl ProcessRunner for RecordingRunner {
  async fn run(&self, invocation: &Invocation) -> Result<ProcessExit, RunError> {
    self.calls.lock().unwrap().push(invocation.clone());

    if self.fail_when.as_ref().is_some_and(|f| f(invocation)) {
      return Ok(ProcessExit(Some(1)));
    }

    if self.simulate {
      simulate_tool(invocation);
    }

    Ok(ProcessExit::SUCCESS)
  }
}

fn simulate_tool(invocation: &Invocation) {
  let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
  match (invocation.program.as_str(), args.as_slice()) {
    ("git", ["clone", .., dest]) => {
      let dest = PathBuf::from(dest);
      std::fs::create_dir_all(&dest).unwrap();
      std::fs::write(dest.join("CMakeLists.txt"), "project(fake)\n").unwrap();
    }
    ("cmake", ["--build", ".", "--config", label, ..]) => {
      let rundir = invocation.cwd.join("rundir").join(label);
      std::fs::create_dir_all(rundir.join("bin")).unwrap();
      std::fs::write(rundir.join("bin").join("app.bin"), "binary").unwrap();
    }
    ("cmake", _) => {
      std::fs::write(invocation.cwd.join("CMakeCache.txt"), "generated").unwrap();
    }
    ("7z", ["x", _, out, ..]) => {
      let dest = PathBuf::from(out.trim_start_matches("-o"));
      std::fs::create_dir_all(dest.join("sdk_root").join("cmake")).unwrap();
      std::fs::write(dest.join("sdk_root").join("cmake").join("sdk.cmake"), "sdk").unwrap();
    }
    _ => {}
  }
}

/// Serves the same archive bytes for every URL.
pub struct FixtureDownloader {
  payload: Vec<u8>,
  fail: bool,
  fetched: Mutex<Vec<String>>,
}

impl FixtureDownloader {
  pub fn new(payload: Vec<u8>) -> Self {
    Self {
      payload,
      fail: false,
      fetched: Mutex::new(Vec::new()),
    }
  }

  pub fn failing() -> Self {
    Self {
      payload: Vec::new(),
      fail: true,
      fetched: Mutex::new(Vec::new()),
    }
  }

  pub fn fetched(&self) -> Vec<String> {
    self.fetched.lock().unwrap().clone()
  }
}

impl Downloader for FixtureDownloader {
  async fn download(&self, url: &str, dest: &Path) -> Result<u64, StageError> {
    self.fetched.lock().unwrap().push(url.to_string());
    if self.fail {
      return Err(StageError::Network {
        url: url.to_string(),
        message: "HTTP 503 Service Unavailable".to_string(),
      });
    }
    std::fs::write(dest, &self.payload).unwrap();
    Ok(self.payload.len() as u64)
  }
}

/// Build a zip archive from `(path, content)` pairs. Paths ending in `/` are directories.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
  let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
  let options = SimpleFileOptions::default();
  for (path, content) in entries {
    if path.ends_with('/') {
      writer.add_directory(*path, options).unwrap();
    } else {
      writer.start_file(*path, options).unwrap();
      writer.write_all(content.as_bytes()).unwrap();
    }
  }
  writer.finish().unwrap().into_inner()
}

/// Build a gzip-compressed tarball from `(path, content)` pairs.
pub fn tar_gz_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
  let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
  let mut builder = tar::Builder::new(encoder);
  for (path, content) in entries {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, path, content.as_bytes()).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap()
}

/// Like [`tar_gz_bytes`], but entry names are written into the header
/// verbatim, so `..` and absolute paths survive.
pub fn tar_gz_raw_names(entries: &[(&str, &str)]) -> Vec<u8> {
  let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
  let mut builder = tar::Builder::new(encoder);
  for (name, content) in entries {
    let mut header = tar::Header::new_old();
    header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, content.as_bytes()).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap()
}

/// Returns the program and args to run a shell script.
#[cfg(unix)]
pub fn shell_script(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_script(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}
