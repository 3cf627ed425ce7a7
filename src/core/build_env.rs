//! Build environment setup
//!
//! Assembles the environment for child processes spawned by package recipes:
//! the parent environment plus INCLUDE/LIB pointing into the install prefix,
//! compiler selection, and per-package overrides.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;

use crate::core::context::{BuildContext, TargetSystem, Toolset};

/// Environment for the commands of one package build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildEnvironment {
    /// Base variables, normally the parent process environment
    base: HashMap<String, String>,
    /// Separator for list-valued variables
    separator: &'static str,
    include_dir: String,
    lib_dir: String,
    install_prefix: String,
    toolset: Toolset,
    stdlib: String,
    /// Package overrides; a key starting with `+` appends
    overrides: BTreeMap<String, String>,
}

impl BuildEnvironment {
    /// Environment derived from the current process environment
    pub fn for_context(ctx: &BuildContext) -> Self {
        Self::with_base(ctx, unicode_vars(std::env::vars_os()))
    }

    /// Environment derived from an explicit base
    pub fn with_base(ctx: &BuildContext, base: HashMap<String, String>) -> Self {
        Self {
            base,
            separator: ctx.host_system.path_separator(),
            include_dir: ctx.include_dir().display().to_string(),
            lib_dir: ctx.lib_dir().display().to_string(),
            install_prefix: ctx.install_prefix.display().to_string(),
            toolset: ctx.toolset,
            stdlib: ctx.stdlib.as_str().to_string(),
            overrides: BTreeMap::new(),
        }
    }

    /// Add package-specific overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        self.overrides
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Add a single override
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.overrides.insert(key.to_string(), value.to_string());
        self
    }

    /// Separator used for list-valued variables on this host
    pub fn separator(&self) -> &str {
        self.separator
    }

    fn append(&self, env: &mut HashMap<String, String>, key: &str, value: &str) {
        let joined = match env.get(key) {
            Some(existing) => format!("{existing}{}{value}", self.separator),
            None => format!("{}{value}", self.separator),
        };
        env.insert(key.to_string(), joined);
    }

    /// Convert to environment variable map for process execution
    pub fn to_env_map(&self) -> HashMap<String, String> {
        let mut env = self.base.clone();

        self.append(&mut env, "INCLUDE", &self.include_dir);
        self.append(&mut env, "LIB", &self.lib_dir);

        for (key, value) in &self.overrides {
            match key.strip_prefix('+') {
                Some(key) => self.append(&mut env, key, value),
                None => {
                    env.insert(key.clone(), value.clone());
                }
            }
        }

        match self.toolset {
            Toolset::Gcc => {
                env.insert("CC".to_string(), "gcc".to_string());
                env.insert("CXX".to_string(), "g++".to_string());
            }
            Toolset::Clang => {
                env.insert("CC".to_string(), "clang".to_string());
                env.insert("CXX".to_string(), "clang++".to_string());
                let flags = env.get("CXXFLAGS").map(String::as_str).unwrap_or_default();
                let flags = format!("{flags} -stdlib={}", self.stdlib).trim().to_string();
                env.insert("CXXFLAGS".to_string(), flags);
            }
            Toolset::Msvc15 | Toolset::Msvc16 => {}
        }

        env.insert("BUILD_PREFIX".to_string(), self.install_prefix.clone());
        env
    }
}

/// Whether commands on this host need Windows-style invocation
pub fn is_windows_host(ctx: &BuildContext) -> bool {
    ctx.host_system == TargetSystem::Windows
}

/// Keep the variables that are valid Unicode
///
/// Children get exactly this map, so the others are left out with a warning.
fn unicode_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                let key = key.unwrap_or_else(|k| k.to_string_lossy().into_owned());
                tracing::warn!(
                    "Not passing environment variable {key} to builds: not valid UTF-8"
                );
                None
            }
        })
        .collect()
}
