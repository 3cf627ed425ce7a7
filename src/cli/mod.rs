//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ntarget: ",
    env!("VERGEN_CARGO_TARGET_TRIPLE"),
    "\nrustc: ",
    env!("VERGEN_RUSTC_SEMVER"),
    "\nbuilt: ",
    env!("VERGEN_BUILD_TIMESTAMP"),
);

/// tpbuild - Build third-party native libraries from source
///
/// Resolves dependencies between package definitions and builds them in
/// order into a shared installation prefix.
#[derive(Parser, Debug)]
#[command(name = "tpbuild")]
#[command(author, version, long_version = LONG_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory containing the package definition files
    #[arg(long, global = true, env = "TPBUILD_PACKAGES_DIR", default_value = ".")]
    pub packages_dir: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        if let Some(cmd) = self.command {
            cmd.run(&self.packages_dir)
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{StdLib, TargetPlatform, Toolset};
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_arguments() {
        let cli = Cli::try_parse_from([
            "tpbuild", "-vv", "build", "-t", "clang", "-p", "arm64", "-l", "libc++", "-i=no",
            "tiff",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Build(args)) => {
                assert_eq!(args.toolset, Some(Toolset::Clang));
                assert_eq!(args.target_platform, TargetPlatform::Arm64);
                assert_eq!(args.stdlib, StdLib::Libcxx);
                assert!(!args.selection.include_dependencies);
                assert_eq!(args.selection.packages, vec!["tiff".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_include_dependencies_defaults() {
        let bare = Cli::try_parse_from(["tpbuild", "order", "-i", "zlib"]).unwrap();
        let omitted = Cli::try_parse_from(["tpbuild", "order", "zlib"]).unwrap();
        for cli in [bare, omitted] {
            match cli.command {
                Some(Commands::Order { selection }) => {
                    assert!(selection.include_dependencies);
                }
                other => panic!("unexpected command: {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_toolset_is_rejected() {
        assert!(Cli::try_parse_from(["tpbuild", "build", "-t", "icc"]).is_err());
    }
}
