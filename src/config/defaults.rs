//! Default configuration values

/// Maximum number of download retry attempts
pub const MAX_DOWNLOAD_RETRIES: u32 = 3;

/// Base delay for download retry backoff (in milliseconds)
pub const DOWNLOAD_RETRY_DELAY_MS: u64 = 1000;

/// Name of the driver's own configuration file in the packages directory
pub const CONFIG_FILE_NAME: &str = "tpbuild.toml";

/// File extension of package definition files
pub const DEFINITION_EXTENSION: &str = "toml";

/// Work directory (relative to the packages directory) archives are extracted into
pub const WORK_DIR_NAME: &str = ".work";

/// Subdirectory of a cmake source tree used for out-of-tree builds
pub const CMAKE_BUILD_DIR: &str = "_build";

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
