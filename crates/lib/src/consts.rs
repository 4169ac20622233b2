pub const APP_NAME: &str = "scissors";

/// Environment variable overriding the build root.
pub const ROOT_ENV: &str = "SCISSORS_ROOT";

/// Optional configuration file looked up in the build root.
pub const CONFIG_FILENAME: &str = "scissors.toml";

/// Marker file name, written once a stage fully succeeded. See `Stage::marker_path`.
pub const STAGE_COMPLETE_MARKER: &str = ".scissors-complete";

/// Version of the marker file format.
pub const STAGE_MARKER_VERSION: u32 = 1;

pub const DEFAULT_DEPS_URL: &str = "https://obsproject.com/downloads/dependencies2017.zip";
pub const DEFAULT_OBS_REPOSITORY: &str = "https://github.com/obsproject/obs-studio";
pub const DEFAULT_CEF_URL: &str = "https://cdn-fastly.obsproject.com/downloads/cef_binary_4280_windows64.7z";
