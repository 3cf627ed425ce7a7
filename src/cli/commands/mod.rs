//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod list;
pub mod order;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Args, Subcommand};

use crate::core::context::{StdLib, TargetPlatform, TargetSystem, Toolset};

/// Which packages a command operates on
#[derive(Args, Debug, Clone)]
pub struct PackageSelection {
    /// Packages to operate on (default: every package in the directory)
    pub packages: Vec<String>,

    /// Pull in missing dependencies automatically (-i alone means true)
    #[arg(
        short = 'i',
        long,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "true",
        default_missing_value = "true",
        value_parser = BoolishValueParser::new(),
        value_name = "BOOL"
    )]
    pub include_dependencies: bool,
}

/// Options of `tpbuild build`
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub selection: PackageSelection,

    /// The toolset to build with (defaults to [build] toolset in tpbuild.toml)
    #[arg(short, long, value_enum)]
    pub toolset: Option<Toolset>,

    /// The target platform to build for
    #[arg(short = 'p', long, value_enum, default_value_t = TargetPlatform::X86_64)]
    pub target_platform: TargetPlatform,

    /// The target operating system to build for (defaults to the host)
    #[arg(short = 's', long, value_enum)]
    pub target_system: Option<TargetSystem>,

    /// The C++ standard library to use with clang
    #[arg(short = 'l', long, value_enum, default_value_t = StdLib::Libstdcxx)]
    pub stdlib: StdLib,

    /// Install into this directory instead of the derived prefix
    #[arg(long)]
    pub prefix: Option<PathBuf>,

    /// Keep extracted sources after building
    #[arg(long)]
    pub keep_temporaries: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build packages and their dependencies
    Build(BuildArgs),

    /// Print the order packages would be built in
    Order {
        #[command(flatten)]
        selection: PackageSelection,
    },

    /// List available packages and their dependencies
    List,
}

impl Commands {
    /// Execute the command
    pub fn run(self, packages_dir: &Path) -> Result<()> {
        let packages_dir = std::path::absolute(packages_dir).with_context(|| {
            format!(
                "Failed to resolve packages directory '{}'",
                packages_dir.display()
            )
        })?;

        match self {
            Self::Build(args) => build::execute(&packages_dir, &args),
            Self::Order { selection } => order::execute(&packages_dir, &selection),
            Self::List => list::execute(&packages_dir),
        }
    }
}
