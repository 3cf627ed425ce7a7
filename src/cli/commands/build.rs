//! Build command implementation
//!
//! Implements `tpbuild build`: derive the build context, order the requested
//! packages and run their lifecycles.

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;

use crate::cli::commands::{BuildArgs, PackageSelection};
use crate::cli::output::{self, create_build_bar, status, OutputConfig};
use crate::core::builder::{BuildObserver, BuildOrchestrator, BuildPlan, BuildReport, PackageState};
use crate::core::context::{BuildContext, BuildContextBuilder, DependencyMode, Toolset};
use crate::core::project_config::ProjectConfig;
use crate::core::registry::PackageRegistry;
use crate::error::ContextError;
use crate::infra::dirs::TpbuildDirs;
use crate::infra::{filesystem, toolchain};

/// Drives the build progress bar from lifecycle transitions
struct ProgressObserver {
    bar: ProgressBar,
}

impl BuildObserver for ProgressObserver {
    fn on_state(&mut self, package: &str, state: PackageState) {
        match state {
            PackageState::Preparing | PackageState::Building => {
                self.bar.set_message(format!("{state} {package}"));
            }
            PackageState::Done => self.bar.inc(1),
            _ => {}
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    order: Vec<&'a str>,
    built: Vec<&'a str>,
    skipped: Vec<&'a str>,
    prefix: String,
}

/// Execute the build command
pub fn execute(packages_dir: &Path, args: &BuildArgs) -> Result<()> {
    let config = ProjectConfig::load(packages_dir)?;
    let ctx = build_context(packages_dir, args, &config)?;

    print_context(&ctx);

    let registry = PackageRegistry::from_dir(packages_dir)?;
    let requested = requested_packages(&registry, &args.selection);
    let plan = BuildPlan::new(&registry, &requested, ctx.dependency_mode)?;
    output::print_info(&format!("Build order: {}", plan.order().join(", ")));

    let keep = args.keep_temporaries || config.keep_temporaries();
    let bar = create_build_bar(plan.len() as u64);
    let mut observer = ProgressObserver { bar: bar.clone() };
    let result = BuildOrchestrator::new(&ctx)
        .keep_temporaries(keep)
        .execute(&plan, &mut observer);
    bar.finish_and_clear();

    let report = result?;
    print_report(&plan, &report, &ctx);
    Ok(())
}

/// Derive the build context from flags, `tpbuild.toml` and defaults
pub fn build_context(
    packages_dir: &Path,
    args: &BuildArgs,
    config: &ProjectConfig,
) -> Result<BuildContext> {
    let toolset: Toolset = args
        .toolset
        .or(config.build.toolset)
        .ok_or(ContextError::MissingToolset)?;

    let mut builder = BuildContextBuilder::new(toolset, packages_dir)
        .target_platform(args.target_platform)
        .stdlib(args.stdlib)
        .download_dir(TpbuildDirs::new().downloads_dir())
        .mirror_url(config.mirror_url())
        .download_retries(config.download_retries())
        .dependency_mode(DependencyMode::from_include_dependencies(
            args.selection.include_dependencies,
        ));
    if let Some(system) = args.target_system {
        builder = builder.target_system(system);
    }
    if let Some(prefix) = &args.prefix {
        let prefix = std::path::absolute(prefix)
            .with_context(|| format!("Failed to resolve prefix '{}'", prefix.display()))?;
        builder = builder.install_prefix(prefix);
    }
    if let Some(jobs) = config.build.jobs {
        builder = builder.jobs(jobs);
    }

    let ctx = builder.build()?;
    toolchain::check_msvc(ctx.toolset, ctx.target_platform)?;

    filesystem::create_dir_all(&ctx.install_prefix).map_err(|e| ContextError::InstallPrefix {
        path: ctx.install_prefix.clone(),
        error: e.to_string(),
    })?;
    Ok(ctx)
}

/// Requested names, or every known package when none were given
pub fn requested_packages(registry: &PackageRegistry, selection: &PackageSelection) -> Vec<String> {
    if selection.packages.is_empty() {
        registry.names().map(ToString::to_string).collect()
    } else {
        selection.packages.clone()
    }
}

fn print_context(ctx: &BuildContext) {
    output::print_info(&format!("* Toolset: {}", ctx.toolset));
    output::print_info(&format!("* Target System: {}", ctx.target_system));
    output::print_info(&format!(
        "* Target Platform: {} ({} bit)",
        ctx.target_platform,
        ctx.target_platform_bits()
    ));
    if ctx.toolset == Toolset::Clang {
        output::print_info(&format!("* Standard Library: {}", ctx.stdlib));
    }
    output::print_info(&format!("* Install Prefix: {}", ctx.install_prefix.display()));
}

fn print_report(plan: &BuildPlan, report: &BuildReport, ctx: &BuildContext) {
    if OutputConfig::global().json {
        let json = JsonReport {
            order: plan.order(),
            built: report.built().collect(),
            skipped: report.skipped().collect(),
            prefix: ctx.install_prefix.display().to_string(),
        };
        if let Ok(text) = serde_json::to_string_pretty(&json) {
            println!("{text}");
        }
        return;
    }

    for name in report.built() {
        output::print_info(&format!("{} {name}", status::SUCCESS));
    }
    for name in report.skipped() {
        output::print_info(&format!("{} {name} (nothing to do)", status::SKIPPED));
    }
    let built = report.built().count();
    let skipped = report.skipped().count();
    output::print_success(&format!("Built {built} package(s), skipped {skipped}"));
}
