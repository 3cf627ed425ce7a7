//! Error types for tpbuild
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Error type returned by package lifecycle implementations
///
/// Lifecycle operations are supplied per package, so each implementation
/// chooses its own concrete error and boxes it at the trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Package registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No definition is discoverable under this name
    #[error("Unknown package '{name}'")]
    UnknownPackage { name: String },

    /// Definition file exists but cannot be read or parsed
    #[error("Invalid definition for package '{name}' at '{path}': {error}")]
    InvalidDefinition {
        name: String,
        path: PathBuf,
        error: String,
    },

    /// Packages directory cannot be listed
    #[error("Failed to read packages directory '{path}': {error}")]
    ReadDir { path: PathBuf, error: String },
}

/// Dependency resolution errors
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Registry lookup failed while loading the working set
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A declared dependency is not part of the working set
    #[error("Cannot find dependency '{dependency}' of package '{package}'")]
    UnresolvedDependency { package: String, dependency: String },

    /// Circular dependency detected
    #[error("Circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
}

/// Lifecycle phase of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Build,
    Cleanup,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prepare => write!(f, "prepare"),
            Self::Build => write!(f, "build"),
            Self::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Build execution errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// A lifecycle operation of a package failed
    #[error("Package '{package}' failed during {phase}: {source}")]
    Lifecycle {
        package: String,
        phase: Phase,
        #[source]
        source: BoxError,
    },

    /// The working directory could not be recorded or restored
    #[error("Working directory error around package '{package}': {source}")]
    WorkingDirectory {
        package: String,
        #[source]
        source: FilesystemError,
    },
}

impl BuildError {
    /// Name of the package that failed
    pub fn package(&self) -> &str {
        match self {
            Self::Lifecycle { package, .. } | Self::WorkingDirectory { package, .. } => package,
        }
    }
}

/// Build context errors
#[derive(Error, Debug)]
pub enum ContextError {
    /// Toolset cannot target the selected platform
    #[error("The toolset '{toolset}' does not support building for the target platform '{platform}'")]
    UnsupportedPlatform { toolset: String, platform: String },

    /// Host operating system is not supported
    #[error("Unsupported host system '{system}'")]
    UnsupportedHost { system: String },

    /// No toolset selected on the command line or in tpbuild.toml
    #[error("No toolset selected. Pass --toolset or set [build] toolset in tpbuild.toml")]
    MissingToolset,

    /// Installation prefix could not be prepared
    #[error("Failed to prepare install prefix '{path}': {error}")]
    InstallPrefix { path: PathBuf, error: String },
}

/// Toolchain probing errors
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// MSVC compiler missing or mismatched
    #[error(
        "The Microsoft Visual Studio {year} C++ compiler is not available on PATH or setup incorrectly.\n\
         Please call this program from a properly setup command prompt.\n\
         If you don't know how to do this, try to call the following command:\n  \
         call \"c:\\Program Files (x86)\\Microsoft Visual Studio\\{year}\\Professional\\VC\\Auxiliary\\Build\\vcvarsall.bat\" {arch}"
    )]
    MsvcUnavailable { year: String, arch: String },

    /// MSVC targeting ARM is not supported
    #[error("Support for MSVC targeting ARM is not yet implemented")]
    MsvcArmUnsupported,

    /// Required executable missing from PATH
    #[error("Required tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },
}

/// Child process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Program could not be started
    #[error("Failed to run '{command}': {error}")]
    Spawn { command: String, error: String },

    /// Program exited unsuccessfully
    #[error("Command '{command}' failed with {status}")]
    Failed { command: String, status: String },

    /// Required program missing
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// Checksum verification failed
    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Max retries exceeded
    #[error("Download failed after {retries} retries: {url}")]
    MaxRetriesExceeded {
        url: String,
        retries: u32,
        #[source]
        last_error: Box<DownloadError>,
    },
}

/// Archive extraction errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Archive file does not exist
    #[error("Archive not found: {path}")]
    NotFound { path: PathBuf },

    /// Archive could not be unpacked
    #[error("Failed to extract archive '{path}': {error}")]
    Extract { path: PathBuf, error: String },

    /// Unpacking through the system tar failed
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to copy file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Invalid glob pattern
    #[error("Invalid file pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    /// Current working directory unavailable
    #[error("Failed to query current directory: {error}")]
    CurrentDir { error: String },

    /// Failed to change working directory
    #[error("Failed to change directory to '{path}': {error}")]
    ChangeDir { path: PathBuf, error: String },
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    ReadError { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    ParseError { path: String, error: String },
}

/// Top-level tpbuild error type
#[derive(Error, Debug)]
pub enum TpbuildError {
    /// Registry error
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Resolver error
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Build error
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Context error
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// Toolchain error
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Process error
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Download error
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Archive error
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}
