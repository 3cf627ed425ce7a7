//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Test project context
///
/// A temporary directory with a `packages/` folder holding definition files
/// and a private download cache, so tests never touch the user cache.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project with an empty packages directory
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        };
        project.create_dir("packages");
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.dir.path().join("packages")
    }

    /// Install prefix used by [`TestProject::build`]
    pub fn prefix(&self) -> PathBuf {
        self.dir.path().join("prefix")
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the test project
    pub fn create_dir(&self, name: &str) {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(path).expect("Failed to create directory");
    }

    /// Write `packages/<name>.toml`
    pub fn add_package(&self, name: &str, definition: &str) {
        self.create_file(&format!("packages/{name}.toml"), definition);
    }

    /// Write a package whose only step appends its name to `{prefix}/order.log`
    pub fn add_logging_package(&self, name: &str, dependencies: &[&str]) {
        self.add_package(name, &logging_definition(name, dependencies, "true"));
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Package names in the order their build step ran
    pub fn build_log(&self) -> Vec<String> {
        let log = self.prefix().join("order.log");
        if !log.exists() {
            return Vec::new();
        }
        std::fs::read_to_string(log)
            .expect("Failed to read build log")
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    /// Run tpbuild against this project's packages directory
    pub fn run(&self, args: &[&str]) -> Output {
        tpbuild(self.path(), &self.packages_dir(), args)
    }

    /// Run `tpbuild build -t gcc --prefix <prefix>` followed by `args`
    pub fn build(&self, args: &[&str]) -> Output {
        let prefix = self.prefix();
        let prefix = prefix.to_str().expect("Non UTF-8 temp path");
        let mut full = vec!["build", "-t", "gcc", "--prefix", prefix];
        full.extend_from_slice(args);
        self.run(&full)
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the tpbuild binary in `cwd`
pub fn tpbuild(cwd: PathBuf, packages_dir: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tpbuild"));
    cmd.current_dir(&cwd)
        .arg("--packages-dir")
        .arg(packages_dir)
        .args(args)
        .env("TPBUILD_CACHE_DIR", cwd.join("cache"))
        .env_remove("TPBUILD_PACKAGES_DIR")
        .env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute tpbuild")
}

/// Definition with one `sh` step logging the package name, then running `last`
pub fn logging_definition(name: &str, dependencies: &[&str], last: &str) -> String {
    let deps = dependencies
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        r#"dependencies = [{deps}]

[[build.steps]]
run = "sh"
args = ["-c", "echo {name} >> {{prefix}}/order.log && {last}"]
"#
    )
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
