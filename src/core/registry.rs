//! Package registry and loader
//!
//! The registry maps package names to either a definition file in the
//! packages directory or a package registered in code. The [`Loader`] pulls
//! packages out of it into a [`WorkingSet`], following declared dependencies.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::defaults;
use crate::core::context::DependencyMode;
use crate::core::package::{Package, PackageDefinition};
use crate::core::recipe::RecipePackage;
use crate::error::{RegistryError, ResolverError};

/// Derive a package name from a definition file name
///
/// Returns `None` for files that are not package definitions, including the
/// driver's own `tpbuild.toml`.
pub fn package_name_from_filename(filename: &str) -> Option<&str> {
    if filename == defaults::CONFIG_FILE_NAME {
        return None;
    }
    let stem = filename.strip_suffix(defaults::DEFINITION_EXTENSION)?;
    let stem = stem.strip_suffix('.')?;
    if stem.is_empty() {
        None
    } else {
        Some(stem)
    }
}

/// List every package name defined in `dir`
pub fn discover(dir: &Path) -> Result<BTreeSet<String>, RegistryError> {
    Ok(definition_files(dir)?.into_keys().collect())
}

fn definition_files(dir: &Path) -> Result<BTreeMap<String, PathBuf>, RegistryError> {
    let read_dir_error = |e: std::io::Error| RegistryError::ReadDir {
        path: dir.to_path_buf(),
        error: e.to_string(),
    };

    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        if !entry.file_type().map_err(read_dir_error)?.is_file() {
            continue;
        }
        let filename = entry.file_name();
        let Some(filename) = filename.to_str() else {
            continue;
        };
        if let Some(name) = package_name_from_filename(filename) {
            files.insert(name.to_string(), entry.path());
        }
    }
    Ok(files)
}

enum Entry {
    Definition(PathBuf),
    Registered(Rc<dyn Package>),
}

/// Named packages available to a build
#[derive(Default)]
pub struct PackageRegistry {
    entries: BTreeMap<String, Entry>,
}

impl PackageRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry of every definition file in `dir`
    pub fn from_dir(dir: &Path) -> Result<Self, RegistryError> {
        let entries = definition_files(dir)?
            .into_iter()
            .map(|(name, path)| (name, Entry::Definition(path)))
            .collect();
        Ok(Self { entries })
    }

    /// Register a package implemented in code
    ///
    /// Replaces any definition file of the same name.
    pub fn register(&mut self, name: impl Into<String>, package: Rc<dyn Package>) {
        self.entries.insert(name.into(), Entry::Registered(package));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names of all available packages, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load a package by name
    ///
    /// Definition files are read and parsed on every call.
    pub fn get(&self, name: &str) -> Result<Rc<dyn Package>, RegistryError> {
        match self.entries.get(name) {
            Some(Entry::Registered(package)) => Ok(Rc::clone(package)),
            Some(Entry::Definition(path)) => {
                let definition = Self::read_definition(name, path)?;
                Ok(Rc::new(RecipePackage::new(name, definition)))
            }
            None => Err(RegistryError::UnknownPackage {
                name: name.to_string(),
            }),
        }
    }

    fn read_definition(name: &str, path: &Path) -> Result<PackageDefinition, RegistryError> {
        let invalid = |error: String| RegistryError::InvalidDefinition {
            name: name.to_string(),
            path: path.to_path_buf(),
            error,
        };
        let content = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        PackageDefinition::from_toml(&content).map_err(|e| invalid(e.to_string()))
    }
}

/// A package loaded into a working set
#[derive(Clone)]
pub struct LoadedPackage {
    pub name: String,
    pub package: Rc<dyn Package>,
}

impl LoadedPackage {
    pub fn dependencies(&self) -> &[String] {
        self.package.dependencies()
    }
}

/// Ordered set of packages assembled for one build invocation
#[derive(Clone, Default)]
pub struct WorkingSet {
    entries: Vec<LoadedPackage>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoadedPackage> {
        self.entries.iter()
    }

    pub(crate) fn insert_front(&mut self, name: &str, package: Rc<dyn Package>) {
        self.entries.insert(
            0,
            LoadedPackage {
                name: name.to_string(),
                package,
            },
        );
    }

    /// Rearrange entries; `order` must be a permutation of `0..len`
    pub(crate) fn reorder(&mut self, order: &[usize]) {
        debug_assert_eq!(order.len(), self.entries.len());
        let reordered = order.iter().map(|&i| self.entries[i].clone()).collect();
        self.entries = reordered;
    }
}

impl fmt::Debug for WorkingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl<'a> IntoIterator for &'a WorkingSet {
    type Item = &'a LoadedPackage;
    type IntoIter = std::slice::Iter<'a, LoadedPackage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Loads packages and their dependency closure into a working set
pub struct Loader<'a> {
    registry: &'a PackageRegistry,
    mode: DependencyMode,
}

impl<'a> Loader<'a> {
    pub fn new(registry: &'a PackageRegistry, mode: DependencyMode) -> Self {
        Self { registry, mode }
    }

    /// Load `name` into `set`, followed by its dependencies
    ///
    /// Loading a name already in the set does nothing, which also terminates
    /// dependency cycles. New packages are inserted at the front of the set.
    pub fn load(&self, name: &str, set: &mut WorkingSet) -> Result<(), ResolverError> {
        self.load_required_by(name, None, set)
    }

    fn load_required_by(
        &self,
        name: &str,
        required_by: Option<&str>,
        set: &mut WorkingSet,
    ) -> Result<(), ResolverError> {
        if set.contains(name) {
            return Ok(());
        }

        if !self.registry.contains(name) {
            return Err(match required_by {
                Some(package) => ResolverError::UnresolvedDependency {
                    package: package.to_string(),
                    dependency: name.to_string(),
                },
                None => RegistryError::UnknownPackage {
                    name: name.to_string(),
                }
                .into(),
            });
        }

        tracing::info!("Loading package {name}");
        let package = self.registry.get(name)?;
        let dependencies = package.dependencies().to_vec();
        set.insert_front(name, package);

        if self.mode.resolves() {
            for dependency in &dependencies {
                self.load_required_by(dependency, Some(name), set)?;
            }
        }
        Ok(())
    }

    /// Build a fresh working set from the requested names, in order
    pub fn close<S: AsRef<str>>(&self, requested: &[S]) -> Result<WorkingSet, ResolverError> {
        let mut set = WorkingSet::new();
        for name in requested {
            self.load(name.as_ref(), &mut set)?;
        }
        Ok(set)
    }
}
