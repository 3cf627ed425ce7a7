//! Toolchain probing
//!
//! MSVC builds only work from a command prompt configured by
//! `vcvarsall.bat`. The compiler banner printed by `cl.exe` tells whether
//! the right compiler for the target platform is on PATH.

use regex::Regex;

use crate::core::context::{TargetPlatform, Toolset};
use crate::error::ToolchainError;
use crate::infra::process::ProcessCommand;

const CL_BANNER: &str = r"^Microsoft \(R\) C/C\+\+ Optimizing Compiler Version (\d+)\.(\d+)\.(\d+)(?:\.(\d+))? for (x86|x64)";

/// Compiler identity parsed from the `cl.exe` banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsvcCompiler {
    pub major: u32,
    pub minor: u32,
    /// `x86` or `x64`
    pub host_arch: String,
}

impl MsvcCompiler {
    /// Parse the first line printed by `cl.exe`
    pub fn parse_banner(output: &str) -> Option<Self> {
        let first_line = output.lines().next()?;
        let re = Regex::new(CL_BANNER).ok()?;
        let captures = re.captures(first_line.trim_start_matches('\u{feff}'))?;
        Some(Self {
            major: captures.get(1)?.as_str().parse().ok()?,
            minor: captures.get(2)?.as_str().parse().ok()?,
            host_arch: captures.get(5)?.as_str().to_string(),
        })
    }

    /// Whether this compiler matches the toolset and target platform
    ///
    /// Both Visual Studio 2017 and 2019 are accepted as long as the
    /// compiler is version 19.2x.
    pub fn matches(&self, toolset: Toolset, platform: TargetPlatform) -> Result<bool, ToolchainError> {
        if !toolset.is_msvc() {
            return Ok(false);
        }
        let expected_arch = match platform {
            TargetPlatform::X86_64 => "x64",
            TargetPlatform::X86_32 => "x86",
            TargetPlatform::Arm64 | TargetPlatform::Arm => {
                return Err(ToolchainError::MsvcArmUnsupported)
            }
        };
        Ok(self.major == 19 && (20..30).contains(&self.minor) && self.host_arch == expected_arch)
    }
}

/// Visual Studio release year for an MSVC toolset
fn vs_year(toolset: Toolset) -> &'static str {
    match toolset {
        Toolset::Msvc16 => "2019",
        _ => "2017",
    }
}

/// Make sure a suitable MSVC compiler is on PATH
///
/// Does nothing for non-MSVC toolsets.
pub fn check_msvc(toolset: Toolset, platform: TargetPlatform) -> Result<(), ToolchainError> {
    if !toolset.is_msvc() {
        return Ok(());
    }

    let unavailable = || ToolchainError::MsvcUnavailable {
        year: vs_year(toolset).to_string(),
        arch: if platform == TargetPlatform::X86_64 {
            "amd64".to_string()
        } else {
            "x86".to_string()
        },
    };

    let output = ProcessCommand::new("cl.exe")
        .output()
        .map_err(|_| unavailable())?;
    let compiler = MsvcCompiler::parse_banner(&output).ok_or_else(unavailable)?;
    tracing::debug!("Found MSVC compiler {compiler:?}");

    if compiler.matches(toolset, platform)? {
        Ok(())
    } else {
        Err(unavailable())
    }
}
