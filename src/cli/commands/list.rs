//! List command implementation
//!
//! Implements `tpbuild list`: show every package with its dependencies.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::OutputConfig;
use crate::core::registry::PackageRegistry;

#[derive(Serialize)]
struct JsonPackage {
    name: String,
    dependencies: Vec<String>,
}

/// Execute the list command
pub fn execute(packages_dir: &Path) -> Result<()> {
    let registry = PackageRegistry::from_dir(packages_dir)?;

    let mut packages = Vec::with_capacity(registry.len());
    for name in registry.names() {
        let package = registry
            .get(name)
            .with_context(|| format!("Failed to load package '{name}'"))?;
        packages.push(JsonPackage {
            name: name.to_string(),
            dependencies: package.dependencies().to_vec(),
        });
    }

    if OutputConfig::global().json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(());
    }

    if packages.is_empty() {
        println!("No packages found in {}", packages_dir.display());
    }
    for package in &packages {
        if package.dependencies.is_empty() {
            println!("{}", package.name);
        } else {
            println!("{} -> {}", package.name, package.dependencies.join(", "));
        }
    }
    Ok(())
}
