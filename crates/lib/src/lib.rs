//! scissors-lib: staged native build orchestration.
//!
//! The crate drives a fixed sequence of stages over a single build root:
//! - acquisition: download and extract archives, clone sources
//! - build: generate and compile native sub-projects with CMake
//! - collection: copy the runtime output to `build/<Debug|Release>`
//!
//! Each stage is skipped when its output is already complete (see [`cache`]),
//! and the first failure ends the run (see [`pipeline`]).

pub mod cache;
pub mod clean;
pub mod config;
pub mod consts;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod stage;
pub mod util;
pub mod variant;
