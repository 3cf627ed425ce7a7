//! Project configuration
//!
//! Reads `tpbuild.toml` from the packages directory. Every setting is
//! optional; command-line flags take precedence over the file, and the
//! built-in defaults in [`crate::config`] apply when neither is given.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{defaults, urls};
use crate::core::context::Toolset;
use crate::error::ConfigError;

/// Contents of `tpbuild.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Archive mirror settings
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Default build options
    #[serde(default)]
    pub build: BuildConfig,

    /// Download behaviour
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Archive mirror settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MirrorConfig {
    /// Base URL archives are fetched from
    pub url: Option<String>,
}

/// Default build options
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    /// Toolset used when none is given on the command line
    pub toolset: Option<Toolset>,

    /// Number of parallel jobs passed to build tools
    pub jobs: Option<usize>,

    /// Keep extracted sources after building
    pub keep_temporaries: Option<bool>,
}

/// Download behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DownloadConfig {
    /// Attempts per archive
    pub retries: Option<u32>,
}

impl ProjectConfig {
    /// Load `tpbuild.toml` from a packages directory
    pub fn load(packages_dir: &Path) -> Result<Self, ConfigError> {
        Self::load_from_path(&packages_dir.join(defaults::CONFIG_FILE_NAME))
    }

    /// Load configuration from a specific path
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Effective mirror URL
    #[must_use]
    pub fn mirror_url(&self) -> &str {
        self.mirror.url.as_deref().unwrap_or(urls::ARCHIVE_MIRROR)
    }

    /// Effective download attempts
    #[must_use]
    pub fn download_retries(&self) -> u32 {
        self.download
            .retries
            .unwrap_or(defaults::MAX_DOWNLOAD_RETRIES)
    }

    #[must_use]
    pub fn keep_temporaries(&self) -> bool {
        self.build.keep_temporaries.unwrap_or(false)
    }
}
