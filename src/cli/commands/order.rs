//! Order command implementation
//!
//! Implements `tpbuild order`: print the build order without building.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::cli::commands::build::requested_packages;
use crate::cli::commands::PackageSelection;
use crate::cli::output::OutputConfig;
use crate::core::builder::BuildPlan;
use crate::core::context::DependencyMode;
use crate::core::registry::PackageRegistry;

#[derive(Serialize)]
struct JsonOrder<'a> {
    order: Vec<&'a str>,
}

/// Execute the order command
pub fn execute(packages_dir: &Path, selection: &PackageSelection) -> Result<()> {
    let registry = PackageRegistry::from_dir(packages_dir)?;
    let requested = requested_packages(&registry, selection);
    let mode = DependencyMode::from_include_dependencies(selection.include_dependencies);
    let plan = BuildPlan::new(&registry, &requested, mode)?;

    if OutputConfig::global().json {
        println!("{}", serde_json::to_string(&JsonOrder { order: plan.order() })?);
    } else {
        for name in plan.order() {
            println!("{name}");
        }
    }
    Ok(())
}
