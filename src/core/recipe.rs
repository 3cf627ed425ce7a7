//! Recipe packages
//!
//! [`RecipePackage`] drives the lifecycle of a package described by a
//! definition file: fetch and unpack the source archive, run its build
//! system and custom steps, and copy the requested files into the prefix.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::core::build_env::BuildEnvironment;
use crate::core::context::BuildContext;
use crate::core::package::{BuildSystem, Package, PackageDefinition, SourceConfig};
use crate::error::BoxError;
use crate::infra::archive;
use crate::infra::download::DownloadManager;
use crate::infra::filesystem;
use crate::infra::process::ProcessCommand;

/// Package built from a `<name>.toml` definition
#[derive(Debug, Clone)]
pub struct RecipePackage {
    name: String,
    dependencies: Vec<String>,
    definition: PackageDefinition,
}

impl RecipePackage {
    /// Create a new recipe package
    pub fn new(name: &str, definition: PackageDefinition) -> Self {
        Self {
            name: name.to_string(),
            dependencies: definition.dependencies.clone().into_vec(),
            definition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &PackageDefinition {
        &self.definition
    }

    /// Directory the package's sources live in below the work directory
    pub fn source_dir(&self, ctx: &BuildContext) -> PathBuf {
        let directory = self
            .definition
            .source
            .as_ref()
            .and_then(|s| s.directory.as_deref())
            .unwrap_or(&self.name);
        ctx.source_path(directory)
    }

    /// Directory the build system is invoked in
    fn script_dir(&self, ctx: &BuildContext) -> PathBuf {
        let source_dir = self.source_dir(ctx);
        match &self.definition.build.subdir {
            Some(subdir) => source_dir.join(subdir),
            None => source_dir,
        }
    }

    /// Substitute `{prefix}`-style placeholders
    pub fn expand(&self, text: &str, ctx: &BuildContext) -> String {
        text.replace("{prefix}", &posix(&ctx.install_prefix))
            .replace("{jobs}", &ctx.jobs.to_string())
            .replace("{bits}", &ctx.target_platform_bits().to_string())
            .replace("{platform}", ctx.target_platform.as_str())
            .replace("{arch}", ctx.target_platform.family())
            .replace("{system}", ctx.target_system.as_str())
            .replace("{toolset}", ctx.toolset.as_str())
            .replace("{stdlib}", ctx.stdlib.as_str())
            .replace("{source}", &posix(&self.source_dir(ctx)))
    }

    fn expand_all(&self, args: &[String], ctx: &BuildContext) -> Vec<String> {
        args.iter().map(|a| self.expand(a, ctx)).collect()
    }

    fn fetch_source(&self, source: &SourceConfig, ctx: &BuildContext) -> Result<PathBuf, BoxError> {
        let archive_path = ctx.download_dir.join(&source.archive);
        let url = source
            .url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", ctx.mirror_url, source.archive));

        DownloadManager::with_config(ctx.download_retries, defaults::DOWNLOAD_RETRY_DELAY_MS)
            .fetch(&url, &archive_path, source.sha256.as_deref())?;
        Ok(archive_path)
    }

    fn apply_patches(&self, source: &SourceConfig, ctx: &BuildContext) -> Result<(), BoxError> {
        let source_dir = self.source_dir(ctx);
        for patch in &source.patches {
            let patch_file = ctx.packages_dir.join(patch);
            tracing::info!("Applying patch \"{}\"", patch_file.display());
            let content = filesystem::read_file(&patch_file)?;
            ProcessCommand::new("patch")
                .arg("-p1")
                .current_dir(&source_dir)
                .stdin(content.into_bytes())
                .run()?;
        }
        Ok(())
    }

    fn run_build_system(
        &self,
        ctx: &BuildContext,
        script_dir: &Path,
        env: &HashMap<String, String>,
    ) -> Result<(), BoxError> {
        let build = &self.definition.build;
        let args = self.expand_all(&build.args, ctx);
        let prefix = posix(&ctx.install_prefix);
        let jobs = format!("-j{}", ctx.jobs);

        match build.system {
            BuildSystem::Cmake => {
                let build_dir = script_dir.join(defaults::CMAKE_BUILD_DIR);
                filesystem::create_dir_all(&build_dir)?;

                let mut configure = ProcessCommand::new("cmake")
                    .arg(posix(script_dir))
                    .args(["-G".to_string(), ctx.cmake_generator.name.clone()]);
                if let Some(platform) = &ctx.cmake_generator.platform {
                    configure = configure.args(["-A", platform.as_str()]);
                }
                configure = configure.arg(format!("-DCMAKE_INSTALL_PREFIX:PATH={prefix}"));
                if let Some(build_type) = &build.build_type {
                    configure = configure.arg(format!("-DCMAKE_BUILD_TYPE={build_type}"));
                }
                configure
                    .args(args)
                    .current_dir(&build_dir)
                    .env(env.clone())
                    .run()?;

                let mut compile = ProcessCommand::new("cmake").args(["--build", "."]);
                if build.install {
                    compile = compile.args(["--target", "install"]);
                }
                if let Some(build_type) = &build.build_type {
                    compile = compile.args(["--config", build_type.as_str()]);
                }
                compile.current_dir(&build_dir).env(env.clone()).run()?;
            }
            BuildSystem::Configure => {
                ProcessCommand::new(posix(&script_dir.join("configure")))
                    .arg(format!("--prefix={prefix}"))
                    .args(args)
                    .current_dir(script_dir)
                    .env(env.clone())
                    .run()?;
                self.make(ctx, script_dir, env, Vec::new())?;
            }
            BuildSystem::Make => self.make(ctx, script_dir, env, args)?,
            BuildSystem::Ninja => {
                ProcessCommand::new("ninja")
                    .arg(jobs)
                    .args(args)
                    .current_dir(script_dir)
                    .env(env.clone())
                    .run()?;
                if build.install {
                    ProcessCommand::new("ninja")
                        .arg("install")
                        .current_dir(script_dir)
                        .env(env.clone())
                        .run()?;
                }
            }
            BuildSystem::Custom => {}
        }
        Ok(())
    }

    fn make(
        &self,
        ctx: &BuildContext,
        script_dir: &Path,
        env: &HashMap<String, String>,
        args: Vec<String>,
    ) -> Result<(), BoxError> {
        let var = |key: &str| env.get(key).cloned().unwrap_or_default();
        let mut make = ProcessCommand::new("make")
            .arg(format!("CC={}", var("CC")))
            .arg(format!("CXX={}", var("CXX")))
            .arg(format!("CFLAGS={}", var("CFLAGS")))
            .arg(format!("CXXFLAGS={}", var("CXXFLAGS")))
            .arg(format!("-j{}", ctx.jobs))
            .args(args);
        if self.definition.build.install {
            make = make
                .arg("install")
                .arg(format!("PREFIX={}", posix(&ctx.install_prefix)));
        }
        make.current_dir(script_dir).env(env.clone()).run()?;
        Ok(())
    }

    fn run_steps(
        &self,
        ctx: &BuildContext,
        script_dir: &Path,
        env: &HashMap<String, String>,
    ) -> Result<(), BoxError> {
        for step in &self.definition.build.steps {
            if !step.applies_to(ctx) {
                tracing::debug!("Skipping step '{}' of '{}'", step.run, self.name);
                continue;
            }
            ProcessCommand::new(self.expand(&step.run, ctx))
                .args(self.expand_all(&step.args, ctx))
                .current_dir(script_dir)
                .env(env.clone())
                .run()?;
        }
        Ok(())
    }

    fn install_files(&self, ctx: &BuildContext) -> Result<(), BoxError> {
        let source_dir = self.source_dir(ctx);
        for rule in &self.definition.install {
            let from = source_dir.join(self.expand(&rule.from, ctx));
            let to = ctx.install_prefix.join(self.expand(&rule.to, ctx));
            let installed = filesystem::install_files(&from, &rule.patterns, &to)?;
            if installed.is_empty() {
                tracing::warn!(
                    "No files in \"{}\" matched {:?}",
                    from.display(),
                    rule.patterns
                );
            }
        }
        Ok(())
    }
}

impl Package for RecipePackage {
    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn prepare(&self, ctx: &BuildContext) -> Result<bool, BoxError> {
        if !self.definition.supports(ctx) {
            tracing::info!(
                "{} does not support {} with {}",
                self.name,
                ctx.target_system,
                ctx.toolset
            );
            return Ok(false);
        }

        filesystem::create_dir_all(&ctx.work_dir)?;
        let source_dir = self.source_dir(ctx);

        match &self.definition.source {
            Some(source) => {
                let archive_path = self.fetch_source(source, ctx)?;
                archive::extract(&archive_path, &ctx.work_dir)?;
                if !source_dir.is_dir() {
                    return Err(format!(
                        "Archive '{}' did not contain the directory '{}'",
                        source.archive,
                        source_dir.display()
                    )
                    .into());
                }
                self.apply_patches(source, ctx)?;
            }
            None => filesystem::create_dir_all(&source_dir)?,
        }
        Ok(true)
    }

    fn build(&self, ctx: &BuildContext) -> Result<(), BoxError> {
        let script_dir = self.script_dir(ctx);
        filesystem::set_current_dir(&script_dir)?;

        let env = BuildEnvironment::for_context(ctx)
            .with_overrides(&self.definition.build.env)
            .to_env_map();

        self.run_build_system(ctx, &script_dir, &env)?;
        self.run_steps(ctx, &script_dir, &env)?;
        self.install_files(ctx)
    }

    fn cleanup(&self, ctx: &BuildContext) -> Result<(), BoxError> {
        filesystem::remove_dir_all(&self.source_dir(ctx))?;
        Ok(())
    }
}

/// Path with forward slashes, as build tools on every host accept
fn posix(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{test_context, StdLib, TargetSystem, Toolset};
    use tempfile::TempDir;

    fn recipe(name: &str, toml: &str) -> RecipePackage {
        RecipePackage::new(name, PackageDefinition::from_toml(toml).unwrap())
    }

    fn write_tar_gz(path: &Path, entries: &[(&str, &str)]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_dependencies_are_normalized() {
        let package = recipe("tiff", r#"dependencies = "zlib-1.2.11""#);
        assert_eq!(package.dependencies(), ["zlib-1.2.11".to_string()]);
        assert_eq!(package.name(), "tiff");
    }

    #[test]
    fn test_expand_placeholders() {
        let temp = TempDir::new().unwrap();
        let mut ctx = test_context(temp.path());
        ctx.toolset = Toolset::Clang;
        ctx.stdlib = StdLib::Libcxx;
        let package = recipe("boost", "");

        let expanded = package.expand("{toolset}:{stdlib}:{bits}:{platform}:{system}:-j{jobs}", &ctx);
        assert_eq!(expanded, "clang:libc++:64:x86_64:linux:-j2");
        assert_eq!(package.expand("architecture={arch}", &ctx), "architecture=x86");
        ctx.target_platform = crate::core::context::TargetPlatform::Arm64;
        assert_eq!(package.expand("{arch}-{bits}", &ctx), "arm-64");
        assert_eq!(
            package.expand("--prefix={prefix}", &ctx),
            format!("--prefix={}", posix(&ctx.install_prefix))
        );
        assert!(package.expand("{source}", &ctx).ends_with("work/boost"));
    }

    #[test]
    fn test_source_dir_defaults_to_package_name() {
        let temp = TempDir::new().unwrap();
        let ctx = test_context(temp.path());

        let plain = recipe("zlib-1.2.11", "[source]\narchive = \"zlib-1.2.11.tar.gz\"");
        assert_eq!(plain.source_dir(&ctx), ctx.work_dir.join("zlib-1.2.11"));

        let renamed = recipe(
            "jpeg",
            "[source]\narchive = \"jpegsrc.v9c.tar.gz\"\ndirectory = \"jpeg-9c\"",
        );
        assert_eq!(renamed.source_dir(&ctx), ctx.work_dir.join("jpeg-9c"));
    }

    #[test]
    fn test_prepare_filtered_system_has_nothing_to_do() {
        let temp = TempDir::new().unwrap();
        let ctx = test_context(temp.path());
        let package = recipe("icu4c", r#"systems = ["windows"]"#);

        assert!(!package.prepare(&ctx).unwrap());
        assert!(!ctx.work_dir.exists());
    }

    #[test]
    fn test_prepare_without_source_creates_directory() {
        let temp = TempDir::new().unwrap();
        let ctx = test_context(temp.path());
        let package = recipe("meta", "");

        assert!(package.prepare(&ctx).unwrap());
        assert!(ctx.work_dir.join("meta").is_dir());

        package.cleanup(&ctx).unwrap();
        assert!(!ctx.work_dir.join("meta").exists());
    }

    #[test]
    fn test_prepare_extracts_cached_archive() {
        let temp = TempDir::new().unwrap();
        let ctx = test_context(temp.path());
        write_tar_gz(
            &ctx.download_dir.join("zlib-1.2.11.tar.gz"),
            &[("zlib-1.2.11/zlib.h", "#define ZLIB_VERSION")],
        );
        let package = recipe("zlib-1.2.11", "[source]\narchive = \"zlib-1.2.11.tar.gz\"");

        assert!(package.prepare(&ctx).unwrap());
        assert!(ctx.work_dir.join("zlib-1.2.11/zlib.h").is_file());
    }

    #[test]
    fn test_prepare_rejects_archive_without_expected_directory() {
        let temp = TempDir::new().unwrap();
        let ctx = test_context(temp.path());
        write_tar_gz(
            &ctx.download_dir.join("odd.tar.gz"),
            &[("other-name/readme", "x")],
        );
        let package = recipe("odd", "[source]\narchive = \"odd.tar.gz\"");

        let err = package.prepare(&ctx).unwrap_err();
        assert!(err.to_string().contains("did not contain"));
    }

    #[test]
    fn test_cleanup_missing_directory_is_ok() {
        let temp = TempDir::new().unwrap();
        let ctx = test_context(temp.path());
        assert!(recipe("never-prepared", "").cleanup(&ctx).is_ok());
    }

    #[test]
    fn test_install_rules_copy_into_prefix() {
        let temp = TempDir::new().unwrap();
        let ctx = test_context(temp.path());
        let package = recipe(
            "headers",
            r#"
[[install]]
from = "include"
patterns = ["*.h"]
to = "include/headers"
"#,
        );
        let include = package.source_dir(&ctx).join("include");
        std::fs::create_dir_all(&include).unwrap();
        std::fs::write(include.join("a.h"), "a").unwrap();

        package.install_files(&ctx).unwrap();
        assert!(ctx.install_prefix.join("include/headers/a.h").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_steps_respect_filters_and_environment() {
        let temp = TempDir::new().unwrap();
        let ctx = test_context(temp.path());
        let package = recipe(
            "steps",
            r#"
[build.env]
STEP_VALUE = "from-env"

[[build.steps]]
run = "sh"
args = ["-c", "echo $STEP_VALUE $BUILD_PREFIX > gcc.txt"]
toolsets = ["gcc"]

[[build.steps]]
run = "sh"
args = ["-c", "touch windows.txt"]
systems = ["windows"]
"#,
        );
        let script_dir = package.script_dir(&ctx);
        std::fs::create_dir_all(&script_dir).unwrap();
        let env = BuildEnvironment::for_context(&ctx)
            .with_overrides(&package.definition().build.env)
            .to_env_map();

        package.run_steps(&ctx, &script_dir, &env).unwrap();

        let out = std::fs::read_to_string(script_dir.join("gcc.txt")).unwrap();
        assert_eq!(out.trim(), format!("from-env {}", ctx.install_prefix.display()));
        assert!(!script_dir.join("windows.txt").exists());
        assert_eq!(ctx.target_system, TargetSystem::Linux);
    }
}
