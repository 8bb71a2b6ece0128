/// Application name, used for data directories.
pub const APP_NAME: &str = "stagehand";

/// Default pipeline configuration file name.
pub const CONFIG_FILENAME: &str = "stagehand.toml";

/// Environment variable naming the workspace root.
pub const WORKSPACE_ENV: &str = "STAGEHAND_WORKSPACE";

/// Environment variable naming the build subdirectory.
pub const BUILD_DIR_ENV: &str = "STAGEHAND_BUILD_DIR";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "STAGEHAND_DATA_DIR";

/// Build directory name used when none is configured.
pub const DEFAULT_BUILD_SUBDIR: &str = "build";

/// Out-of-tree cmake build directory inside the source checkout.
pub const CMAKE_BUILD_SUBDIR: &str = "BUILD";
