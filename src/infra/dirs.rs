//! Platform-specific directory management
//!
//! Source archives are cached per user so that several package trees can
//! share them. `TPBUILD_CACHE_DIR` overrides the platform cache location.

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the cache directory
pub const ENV_CACHE_DIR: &str = "TPBUILD_CACHE_DIR";

const APP_NAME: &str = "tpbuild";
const DOWNLOADS_SUBDIR: &str = "downloads";

/// Directory provider for tpbuild
#[derive(Debug, Clone)]
pub struct TpbuildDirs {
    cache_dir: PathBuf,
}

impl TpbuildDirs {
    /// Resolve directories from the environment or platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_dir: Self::resolve_cache_dir(),
        }
    }

    /// Use an explicit cache directory
    #[must_use]
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Get the cache directory path
    ///
    /// - Linux: `$XDG_CACHE_HOME/tpbuild` or `~/.cache/tpbuild`
    /// - macOS: `~/Library/Caches/tpbuild`
    /// - Windows: `%LOCALAPPDATA%\tpbuild`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    /// Directory holding downloaded source archives
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.cache_dir.join(DOWNLOADS_SUBDIR)
    }

    fn resolve_cache_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CACHE_DIR) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        dirs::cache_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".cache").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".cache").join(APP_NAME))
            })
    }
}

impl Default for TpbuildDirs {
    fn default() -> Self {
        Self::new()
    }
}
