//! Build context
//!
//! Process-wide, read-only configuration shared by every package during one
//! invocation: target platform, target system, toolset, standard library,
//! installation prefix and the directories recipes work in.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// Compiler toolset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Toolset {
    Gcc,
    Clang,
    Msvc15,
    Msvc16,
}

impl Toolset {
    /// Name used on the command line and in definition files
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gcc => "gcc",
            Self::Clang => "clang",
            Self::Msvc15 => "msvc15",
            Self::Msvc16 => "msvc16",
        }
    }

    /// Label used in the installation prefix folder name
    pub fn prefix_label(self) -> &'static str {
        match self {
            Self::Gcc => "gcc",
            Self::Clang => "clang",
            Self::Msvc15 => "vc141",
            Self::Msvc16 => "vc142",
        }
    }

    /// Whether this is a Microsoft Visual C++ toolset
    pub fn is_msvc(self) -> bool {
        matches!(self, Self::Msvc15 | Self::Msvc16)
    }
}

impl fmt::Display for Toolset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target CPU platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum TargetPlatform {
    #[default]
    #[serde(rename = "x86_64")]
    #[value(name = "x86_64")]
    X86_64,
    #[serde(rename = "x86_32")]
    #[value(name = "x86_32")]
    X86_32,
    #[serde(rename = "arm64")]
    #[value(name = "arm64")]
    Arm64,
    #[serde(rename = "arm")]
    #[value(name = "arm")]
    Arm,
}

impl TargetPlatform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::X86_32 => "x86_32",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
        }
    }

    /// Pointer width in bits
    pub fn bits(self) -> u32 {
        match self {
            Self::X86_64 | Self::Arm64 => 64,
            Self::X86_32 | Self::Arm => 32,
        }
    }

    /// Processor family without the width, e.g. `x86` for `x86_32`
    pub fn family(self) -> &'static str {
        if self.is_x86() {
            "x86"
        } else {
            "arm"
        }
    }

    pub fn is_x86(self) -> bool {
        matches!(self, Self::X86_64 | Self::X86_32)
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetSystem {
    Linux,
    Windows,
    Darwin,
}

impl TargetSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Darwin => "darwin",
        }
    }

    /// The system this process runs on
    pub fn host() -> Result<Self, ContextError> {
        Self::from_rust_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value
    pub fn from_rust_os(os: &str) -> Result<Self, ContextError> {
        match os {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            "macos" => Ok(Self::Darwin),
            other => Err(ContextError::UnsupportedHost {
                system: other.to_string(),
            }),
        }
    }

    /// Separator for list-valued environment variables
    pub fn path_separator(self) -> &'static str {
        match self {
            Self::Windows => ";",
            Self::Linux | Self::Darwin => ":",
        }
    }
}

impl fmt::Display for TargetSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// C++ standard library selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum StdLib {
    #[default]
    #[serde(rename = "libstdc++")]
    #[value(name = "libstdc++")]
    Libstdcxx,
    #[serde(rename = "libc++")]
    #[value(name = "libc++")]
    Libcxx,
}

impl StdLib {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Libstdcxx => "libstdc++",
            Self::Libcxx => "libc++",
        }
    }
}

impl fmt::Display for StdLib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether missing dependencies are pulled in or assumed to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyMode {
    /// Load transitive dependencies and fail on unresolvable ones
    #[default]
    Resolve,
    /// Build only what was requested; absent dependencies are assumed
    /// to be satisfied externally
    Ignore,
}

impl DependencyMode {
    pub fn from_include_dependencies(include: bool) -> Self {
        if include {
            Self::Resolve
        } else {
            Self::Ignore
        }
    }

    pub fn resolves(self) -> bool {
        self == Self::Resolve
    }
}

/// CMake generator selection derived from the toolset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmakeGenerator {
    pub name: String,
    /// Value for `-A`, if the generator takes one
    pub platform: Option<String>,
}

impl CmakeGenerator {
    pub fn for_target(toolset: Toolset, platform: TargetPlatform) -> Result<Self, ContextError> {
        let unsupported = || ContextError::UnsupportedPlatform {
            toolset: toolset.to_string(),
            platform: platform.to_string(),
        };

        match toolset {
            Toolset::Gcc | Toolset::Clang => Ok(Self {
                name: "Ninja".to_string(),
                platform: None,
            }),
            Toolset::Msvc16 => {
                let arch = match platform {
                    TargetPlatform::X86_64 => "x64",
                    TargetPlatform::X86_32 => "Win32",
                    TargetPlatform::Arm => "ARM",
                    TargetPlatform::Arm64 => "ARM64",
                };
                Ok(Self {
                    name: "Visual Studio 16 2019".to_string(),
                    platform: Some(arch.to_string()),
                })
            }
            Toolset::Msvc15 => match platform {
                TargetPlatform::X86_64 => Ok(Self {
                    name: "Visual Studio 15 2017 Win64".to_string(),
                    platform: None,
                }),
                TargetPlatform::X86_32 => Ok(Self {
                    name: "Visual Studio 15 2017".to_string(),
                    platform: None,
                }),
                TargetPlatform::Arm | TargetPlatform::Arm64 => Err(unsupported()),
            },
        }
    }
}

/// Shared configuration for one build invocation
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub toolset: Toolset,
    pub target_platform: TargetPlatform,
    pub target_system: TargetSystem,
    pub host_system: TargetSystem,
    pub stdlib: StdLib,
    /// Absolute installation prefix shared by all packages
    pub install_prefix: PathBuf,
    /// Directory holding the package definition files
    pub packages_dir: PathBuf,
    /// Directory archives are extracted into and built in
    pub work_dir: PathBuf,
    /// Directory downloaded archives are cached in
    pub download_dir: PathBuf,
    /// Base URL archives are fetched from
    pub mirror_url: String,
    pub download_retries: u32,
    pub jobs: usize,
    pub cmake_generator: CmakeGenerator,
    pub dependency_mode: DependencyMode,
}

impl BuildContext {
    /// Folder name of the installation prefix, e.g. `x86_64-linux-gcc`
    ///
    /// Clang builds also encode the standard library since both flavours may
    /// be installed side by side.
    pub fn prefix_folder_name(
        toolset: Toolset,
        platform: TargetPlatform,
        system: TargetSystem,
        stdlib: StdLib,
    ) -> String {
        let mut name = format!("{platform}-{system}-{}", toolset.prefix_label());
        if toolset == Toolset::Clang {
            name.push('-');
            name.push_str(stdlib.as_str());
        }
        name
    }

    /// Pointer width of the target platform
    pub fn target_platform_bits(&self) -> u32 {
        self.target_platform.bits()
    }

    /// Directory an extracted package lives in
    pub fn source_path(&self, directory: &str) -> PathBuf {
        self.work_dir.join(directory)
    }

    pub fn include_dir(&self) -> PathBuf {
        self.install_prefix.join("include")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.install_prefix.join("lib")
    }
}

/// Builder for [`BuildContext`]
#[derive(Debug, Clone)]
pub struct BuildContextBuilder {
    toolset: Toolset,
    target_platform: TargetPlatform,
    target_system: Option<TargetSystem>,
    host_system: Option<TargetSystem>,
    stdlib: StdLib,
    install_prefix: Option<PathBuf>,
    packages_dir: PathBuf,
    work_dir: Option<PathBuf>,
    download_dir: Option<PathBuf>,
    mirror_url: String,
    download_retries: u32,
    jobs: Option<usize>,
    dependency_mode: DependencyMode,
}

impl BuildContextBuilder {
    pub fn new(toolset: Toolset, packages_dir: impl Into<PathBuf>) -> Self {
        Self {
            toolset,
            target_platform: TargetPlatform::default(),
            target_system: None,
            host_system: None,
            stdlib: StdLib::default(),
            install_prefix: None,
            packages_dir: packages_dir.into(),
            work_dir: None,
            download_dir: None,
            mirror_url: crate::config::urls::ARCHIVE_MIRROR.to_string(),
            download_retries: crate::config::defaults::MAX_DOWNLOAD_RETRIES,
            jobs: None,
            dependency_mode: DependencyMode::default(),
        }
    }

    #[must_use]
    pub fn target_platform(mut self, platform: TargetPlatform) -> Self {
        self.target_platform = platform;
        self
    }

    #[must_use]
    pub fn target_system(mut self, system: TargetSystem) -> Self {
        self.target_system = Some(system);
        self
    }

    #[must_use]
    pub fn host_system(mut self, system: TargetSystem) -> Self {
        self.host_system = Some(system);
        self
    }

    #[must_use]
    pub fn stdlib(mut self, stdlib: StdLib) -> Self {
        self.stdlib = stdlib;
        self
    }

    #[must_use]
    pub fn install_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.install_prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn mirror_url(mut self, url: &str) -> Self {
        self.mirror_url = url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn download_retries(mut self, retries: u32) -> Self {
        self.download_retries = retries;
        self
    }

    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    #[must_use]
    pub fn dependency_mode(mut self, mode: DependencyMode) -> Self {
        self.dependency_mode = mode;
        self
    }

    /// Resolve defaults and validate the toolset/platform combination
    ///
    /// Paths are taken as given; making the prefix absolute and creating it
    /// on disk is the caller's concern.
    pub fn build(self) -> Result<BuildContext, ContextError> {
        let host_system = match self.host_system {
            Some(system) => system,
            None => TargetSystem::host()?,
        };
        let target_system = self.target_system.unwrap_or(host_system);
        let cmake_generator = CmakeGenerator::for_target(self.toolset, self.target_platform)?;

        let install_prefix = self.install_prefix.unwrap_or_else(|| {
            let folder = BuildContext::prefix_folder_name(
                self.toolset,
                self.target_platform,
                target_system,
                self.stdlib,
            );
            normalize_lexically(&self.packages_dir.join("..").join(folder))
        });
        let work_dir = self
            .work_dir
            .unwrap_or_else(|| self.packages_dir.join(crate::config::defaults::WORK_DIR_NAME));
        let download_dir = self.download_dir.unwrap_or_else(|| self.packages_dir.clone());

        Ok(BuildContext {
            toolset: self.toolset,
            target_platform: self.target_platform,
            target_system,
            host_system,
            stdlib: self.stdlib,
            install_prefix,
            packages_dir: self.packages_dir,
            work_dir,
            download_dir,
            mirror_url: self.mirror_url,
            download_retries: self.download_retries,
            jobs: self.jobs.unwrap_or_else(num_cpus::get).max(1),
            cmake_generator,
            dependency_mode: self.dependency_mode,
        })
    }
}

/// Drop `.` and fold `..` into the preceding component without touching disk
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
pub(crate) fn test_context(root: &std::path::Path) -> BuildContext {
    BuildContextBuilder::new(Toolset::Gcc, root.join("packages"))
        .host_system(TargetSystem::Linux)
        .install_prefix(root.join("prefix"))
        .work_dir(root.join("work"))
        .download_dir(root.join("downloads"))
        .jobs(2)
        .build()
        .expect("gcc context is always valid")
}
