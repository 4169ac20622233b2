//! Shared fakes for pipeline scenario tests.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use scissors_lib::process::{Invocation, ProcessExit, ProcessRunner, RunError};
use scissors_lib::stage::{Downloader, StageError};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Stands in for git, 7z and cmake: records each call and leaves behind what
/// the real tool would produce.
#[derive(Default)]
pub struct FakeTools {
  calls: Mutex<Vec<Invocation>>,
  fail_on: Option<String>,
}

impl FakeTools {
  pub fn new() -> Self {
    Self::default()
  }

  /// Exit non-zero for any invocation whose command line contains `needle`.
  pub fn failing_on(needle: &str) -> Self {
    Self {
      calls: Mutex::new(Vec::new()),
      fail_on: Some(needle.to_string()),
    }
  }

  pub fn command_lines(&self) -> Vec<String> {
    self.calls.lock().unwrap().iter().map(Invocation::command_line).collect()
  }

  pub fn calls(&self) -> Vec<Invocation> {
    self.calls.lock().unwrap().clone()
  }
}

impl ProcessRunner for FakeTools {
  async fn run(&self, invocation: &Invocation) -> Result<ProcessExit, RunError> {
    self.calls.lock().unwrap().push(invocation.clone());

    if self
      .fail_on
      .as_deref()
      .is_some_and(|needle| invocation.command_line().contains(needle))
    {
      return Ok(ProcessExit(Some(1)));
    }

    let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
    match (invocation.program.as_str(), args.as_slice()) {
      ("git", ["clone", .., dest]) => {
        std::fs::create_dir_all(dest).unwrap();
        std::fs::write(Path::new(dest).join("CMakeLists.txt"), "project(obs-studio)\n").unwrap();
      }
      ("7z", ["x", _, out, ..]) => {
        let root = PathBuf::from(out.trim_start_matches("-o")).join("cef_binary_4280");
        std::fs::create_dir_all(root.join("cmake")).unwrap();
        std::fs::write(root.join("CMakeLists.txt"), "project(cef)\n").unwrap();
      }
      ("cmake", ["--build", ".", "--config", label, ..]) => {
        let bin = invocation.cwd.join("rundir").join(label).join("bin").join("64bit");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("obs.dll"), format!("obs {}", label)).unwrap();
      }
      ("cmake", _) => {
        std::fs::write(invocation.cwd.join("CMakeCache.txt"), "cache").unwrap();
      }
      _ => {}
    }

    Ok(ProcessExit::SUCCESS)
  }
}

/// Serves a small dependency bundle for every URL.
#[derive(Default)]
pub struct FakeDownloads {
  fetched: Mutex<Vec<String>>,
}

impl FakeDownloads {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fetched(&self) -> Vec<String> {
    self.fetched.lock().unwrap().clone()
  }
}

impl Downloader for FakeDownloads {
  async fn download(&self, url: &str, dest: &Path) -> Result<u64, StageError> {
    self.fetched.lock().unwrap().push(url.to_string());
    let bytes = deps_bundle();
    std::fs::write(dest, &bytes).unwrap();
    Ok(bytes.len() as u64)
  }
}

fn deps_bundle() -> Vec<u8> {
  let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
  let options = SimpleFileOptions::default();
  writer.add_directory("win64/", options).unwrap();
  writer.start_file("win64/bin/avcodec-58.dll", options).unwrap();
  writer.write_all(b"avcodec").unwrap();
  writer.start_file("win64/include/obs-deps.h", options).unwrap();
  writer.write_all(b"#pragma once\n").unwrap();
  writer.finish().unwrap().into_inner()
}

/// Fresh build root.
pub fn temp_root() -> (TempDir, PathBuf) {
  let temp = TempDir::new().unwrap();
  let root = dunce::canonicalize(temp.path()).unwrap();
  (temp, root)
}
