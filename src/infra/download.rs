//! HTTP download functionality
//!
//! Handles downloading source archives with progress reporting, checksum
//! verification, and retry with exponential backoff.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use sha2::{Digest, Sha256};

use crate::config::defaults;
use crate::error::DownloadError;

/// Download result containing file path and metadata
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the downloaded file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// SHA256 checksum of the downloaded content
    pub checksum: String,
    /// Whether the file was already present
    pub cached: bool,
}

/// Download manager for fetching files with retry support
#[derive(Debug, Clone)]
pub struct DownloadManager {
    client: reqwest::blocking::Client,
    max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds)
    base_delay_ms: u64,
    show_progress: bool,
}

impl DownloadManager {
    /// Create a new download manager
    pub fn new() -> Self {
        Self::with_config(defaults::MAX_DOWNLOAD_RETRIES, defaults::DOWNLOAD_RETRY_DELAY_MS)
    }

    /// Create a download manager with custom settings
    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(300))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
            max_retries: max_retries.max(1),
            base_delay_ms,
            show_progress: true,
        }
    }

    /// Enable or disable the progress bar
    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Get max retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Download `url` to `dest` unless a usable copy already exists
    ///
    /// An existing file is reused when no checksum is given or its checksum
    /// matches; otherwise it is fetched again.
    pub fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected_checksum: Option<&str>,
    ) -> Result<DownloadResult, DownloadError> {
        if dest.is_file() {
            let checksum = file_checksum(dest)?;
            let matches = expected_checksum.map_or(true, |e| e.eq_ignore_ascii_case(&checksum));
            if matches {
                tracing::info!("Using cached archive \"{}\"", dest.display());
                let size = std::fs::metadata(dest).map(|m| m.len()).unwrap_or(0);
                return Ok(DownloadResult {
                    path: dest.to_path_buf(),
                    size,
                    checksum,
                    cached: true,
                });
            }
            tracing::warn!(
                "Cached archive \"{}\" has checksum {checksum}, downloading again",
                dest.display()
            );
        }

        match expected_checksum {
            Some(expected) => self.download_verified(url, dest, expected),
            None => self.download(url, dest),
        }
    }

    /// Download a file with retry logic
    pub fn download(&self, url: &str, dest: &Path) -> Result<DownloadResult, DownloadError> {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.base_delay_ms))
            .with_max_interval(Duration::from_secs(30))
            .with_max_elapsed_time(None)
            .build();

        let mut attempts = 0;
        loop {
            attempts += 1;
            tracing::info!("Downloading archive \"{url}\" (attempt {attempts})");

            match self.download_once(url, dest) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    let _ = std::fs::remove_file(dest);
                    if attempts >= self.max_retries {
                        return Err(DownloadError::MaxRetriesExceeded {
                            url: url.to_string(),
                            retries: self.max_retries,
                            last_error: Box::new(e),
                        });
                    }
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(Duration::from_millis(self.base_delay_ms));
                    tracing::warn!("{e}; retrying in {}ms", delay.as_millis());
                    std::thread::sleep(delay);
                }
            }
        }
    }

    /// Download a file and verify its checksum
    ///
    /// A mismatching file is deleted and not retried.
    pub fn download_verified(
        &self,
        url: &str,
        dest: &Path,
        expected_checksum: &str,
    ) -> Result<DownloadResult, DownloadError> {
        let result = self.download(url, dest)?;

        if !result.checksum.eq_ignore_ascii_case(expected_checksum) {
            let _ = std::fs::remove_file(dest);
            return Err(DownloadError::ChecksumMismatch {
                file: dest.display().to_string(),
                expected: expected_checksum.to_lowercase(),
                actual: result.checksum,
            });
        }

        Ok(result)
    }

    /// Single download attempt without retry
    fn download_once(&self, url: &str, dest: &Path) -> Result<DownloadResult, DownloadError> {
        let network_error = |error: String| DownloadError::NetworkError {
            url: url.to_string(),
            error,
        };
        let io_error = |path: &Path, e: std::io::Error| DownloadError::IoError {
            path: path.to_path_buf(),
            error: e.to_string(),
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| network_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(network_error(format!("HTTP {}", response.status())));
        }

        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let mut file = File::create(dest).map_err(|e| io_error(dest, e))?;

        let bar = self.progress_bar(total_size, dest);
        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut buffer = vec![0u8; 64 * 1024];

        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|e| network_error(e.to_string()))?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .map_err(|e| io_error(dest, e))?;
            hasher.update(&buffer[..read]);
            downloaded += read as u64;
            bar.set_position(downloaded);
        }

        file.flush().map_err(|e| io_error(dest, e))?;
        bar.finish_and_clear();

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            size: downloaded,
            checksum: hex::encode(hasher.finalize()),
            cached: false,
        })
    }

    fn progress_bar(&self, total: u64, dest: &Path) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        bar.set_message(name);
        bar
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA256 checksum of a file on disk
pub fn file_checksum(path: &Path) -> Result<String, DownloadError> {
    let mut file = File::open(path).map_err(|e| DownloadError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| DownloadError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(hex::encode(hasher.finalize()))
}

/// Verify SHA256 checksum of a file
pub fn verify_checksum(path: &Path, expected: &str) -> Result<bool, DownloadError> {
    Ok(file_checksum(path)?.eq_ignore_ascii_case(expected))
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
