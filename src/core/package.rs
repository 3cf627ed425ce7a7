//! Package definition handling
//!
//! A package is anything implementing the [`Package`] lifecycle. Definitions
//! read from `<name>.toml` files are parsed into [`PackageDefinition`] and
//! executed by [`crate::core::recipe::RecipePackage`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::context::{BuildContext, TargetSystem, Toolset};
use crate::error::BoxError;

/// Lifecycle every buildable package implements
///
/// The orchestrator calls `cleanup`, then `prepare`, then `build` when
/// `prepare` returned `true`, then `cleanup` again. Implementations may
/// change the process working directory; it is restored before the final
/// `cleanup` and before the next package starts.
pub trait Package {
    /// Names of packages that must be built first
    fn dependencies(&self) -> &[String];

    /// Fetch and unpack sources. `Ok(false)` means there is nothing to build.
    fn prepare(&self, ctx: &BuildContext) -> Result<bool, BoxError>;

    /// Compile and install into the shared prefix
    fn build(&self, ctx: &BuildContext) -> Result<(), BoxError>;

    /// Remove temporary files. Must tolerate a partially prepared state.
    fn cleanup(&self, ctx: &BuildContext) -> Result<(), BoxError>;
}

/// Dependency declaration: either a single name or a list of names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Dependencies {
    One(String),
    Many(Vec<String>),
}

impl Default for Dependencies {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl Dependencies {
    /// Normalize into a sequence; a bare name becomes a one-element list
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }
}

/// Package definition file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageDefinition {
    /// Packages that must be built before this one
    #[serde(default)]
    pub dependencies: Dependencies,

    /// Target systems this package supports (empty = all)
    #[serde(default)]
    pub systems: Vec<TargetSystem>,

    /// Toolsets this package supports (empty = all)
    #[serde(default)]
    pub toolsets: Vec<Toolset>,

    /// Source archive
    #[serde(default)]
    pub source: Option<SourceConfig>,

    /// Build configuration
    #[serde(default)]
    pub build: PackageBuildConfig,

    /// Files copied into the installation prefix after building
    #[serde(default)]
    pub install: Vec<InstallRule>,
}

/// Source archive configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// Archive file name on the mirror
    pub archive: String,

    /// Explicit download URL (defaults to mirror + archive)
    #[serde(default)]
    pub url: Option<String>,

    /// SHA256 checksum of the archive
    #[serde(default)]
    pub sha256: Option<String>,

    /// Directory the archive extracts to (defaults to the package name)
    #[serde(default)]
    pub directory: Option<String>,

    /// Patch files, relative to the packages directory
    #[serde(default)]
    pub patches: Vec<String>,
}

/// Build system driving the compile step
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    Cmake,
    Configure,
    Make,
    Ninja,
    /// Only the explicit steps are run
    #[default]
    Custom,
}

/// Package build configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageBuildConfig {
    /// Build system type
    #[serde(default)]
    pub system: BuildSystem,

    /// Directory (relative to the source directory) holding the build scripts
    #[serde(default)]
    pub subdir: Option<String>,

    /// Build type passed to cmake (e.g. Release)
    #[serde(default)]
    pub build_type: Option<String>,

    /// Extra arguments for the configure step
    #[serde(default)]
    pub args: Vec<String>,

    /// Run the install target after building
    #[serde(default = "default_true")]
    pub install: bool,

    /// Environment overrides; a key starting with `+` appends
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Custom commands, run after the build system
    #[serde(default)]
    pub steps: Vec<BuildStep>,
}

fn default_true() -> bool {
    true
}

impl Default for PackageBuildConfig {
    fn default() -> Self {
        Self {
            system: BuildSystem::default(),
            subdir: None,
            build_type: None,
            args: Vec::new(),
            install: true,
            env: BTreeMap::new(),
            steps: Vec::new(),
        }
    }
}

/// A single build step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildStep {
    /// Command to run
    pub run: String,

    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Run only with these toolsets (empty = all)
    #[serde(default)]
    pub toolsets: Vec<Toolset>,

    /// Run only for these target systems (empty = all)
    #[serde(default)]
    pub systems: Vec<TargetSystem>,
}

impl BuildStep {
    /// Whether this step applies to the given context
    pub fn applies_to(&self, ctx: &BuildContext) -> bool {
        (self.toolsets.is_empty() || self.toolsets.contains(&ctx.toolset))
            && (self.systems.is_empty() || self.systems.contains(&ctx.target_system))
    }
}

/// File installation rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallRule {
    /// Source directory (relative to the package source directory)
    #[serde(default = "default_from")]
    pub from: String,

    /// Glob patterns relative to `from`
    pub patterns: Vec<String>,

    /// Destination directory (relative to the install prefix)
    #[serde(default)]
    pub to: String,
}

fn default_from() -> String {
    ".".to_string()
}

impl PackageDefinition {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Whether the package can be built for this context at all
    pub fn supports(&self, ctx: &BuildContext) -> bool {
        (self.systems.is_empty() || self.systems.contains(&ctx.target_system))
            && (self.toolsets.is_empty() || self.toolsets.contains(&ctx.toolset))
    }
}
