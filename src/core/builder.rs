//! Build orchestration logic
//!
//! Coordinates the build process across multiple packages: the working set
//! is closed over dependencies, ordered, and then every package runs its
//! `cleanup -> prepare -> build -> cleanup` lifecycle in turn.

use std::fmt;
use std::path::Path;

use crate::core::context::{BuildContext, DependencyMode};
use crate::core::package::Package;
use crate::core::registry::{Loader, PackageRegistry, WorkingSet};
use crate::core::resolver::order_working_set;
use crate::error::{BoxError, BuildError, Phase, ResolverError};
use crate::infra::filesystem::{self, WorkDirGuard};

/// An ordered working set, ready to execute
pub struct BuildPlan {
    set: WorkingSet,
}

impl BuildPlan {
    /// Close `requested` over its dependencies and order the result
    pub fn new<S: AsRef<str>>(
        registry: &PackageRegistry,
        requested: &[S],
        mode: DependencyMode,
    ) -> Result<Self, ResolverError> {
        let mut set = Loader::new(registry, mode).close(requested)?;
        order_working_set(&mut set, mode)?;
        Ok(Self { set })
    }

    /// Package names in build order
    pub fn order(&self) -> Vec<&str> {
        self.set.names()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.set
    }
}

impl fmt::Debug for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildPlan")
            .field("order", &self.order())
            .finish()
    }
}

/// Where a package is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    Pending,
    Cleaning,
    Preparing,
    Skipped,
    Building,
    Done,
    Failed,
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Cleaning => "cleaning",
            Self::Preparing => "preparing",
            Self::Skipped => "skipped",
            Self::Building => "building",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Receives lifecycle transitions, e.g. to drive a progress bar
pub trait BuildObserver {
    fn on_state(&mut self, _package: &str, _state: PackageState) {}
}

/// Observer that ignores every transition
#[derive(Debug, Default)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {}

/// How a package finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageStatus {
    Built,
    /// `prepare` reported nothing to do
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    pub name: String,
    pub status: PackageStatus,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub packages: Vec<PackageOutcome>,
}

impl BuildReport {
    pub fn built(&self) -> impl Iterator<Item = &str> {
        self.with_status(PackageStatus::Built)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.with_status(PackageStatus::Skipped)
    }

    fn with_status(&self, status: PackageStatus) -> impl Iterator<Item = &str> {
        self.packages
            .iter()
            .filter(move |p| p.status == status)
            .map(|p| p.name.as_str())
    }
}

/// Build orchestrator
///
/// Packages run strictly one after another. The process working directory
/// is captured before each package and restored after it on every path.
#[derive(Debug)]
pub struct BuildOrchestrator<'a> {
    ctx: &'a BuildContext,
    keep_temporaries: bool,
}

impl<'a> BuildOrchestrator<'a> {
    /// Create a new build orchestrator
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self {
            ctx,
            keep_temporaries: false,
        }
    }

    /// Skip the final cleanup so sources can be inspected
    #[must_use]
    pub fn keep_temporaries(mut self, keep: bool) -> Self {
        self.keep_temporaries = keep;
        self
    }

    /// Plan and execute `requested` in one go
    pub fn run<S: AsRef<str>>(
        &self,
        registry: &PackageRegistry,
        requested: &[S],
        observer: &mut dyn BuildObserver,
    ) -> Result<BuildReport, crate::error::TpbuildError> {
        let plan = BuildPlan::new(registry, requested, self.ctx.dependency_mode)?;
        Ok(self.execute(&plan, observer)?)
    }

    /// Execute every package of `plan` in order
    ///
    /// The first failure aborts the run; later packages are left untouched.
    pub fn execute(
        &self,
        plan: &BuildPlan,
        observer: &mut dyn BuildObserver,
    ) -> Result<BuildReport, BuildError> {
        for name in plan.order() {
            observer.on_state(name, PackageState::Pending);
        }

        let mut report = BuildReport::default();
        for entry in plan.working_set() {
            let status = self.execute_package(&entry.name, entry.package.as_ref(), observer)?;
            report.packages.push(PackageOutcome {
                name: entry.name.clone(),
                status,
            });
        }
        Ok(report)
    }

    fn execute_package(
        &self,
        name: &str,
        package: &dyn Package,
        observer: &mut dyn BuildObserver,
    ) -> Result<PackageStatus, BuildError> {
        let working_directory = |source| BuildError::WorkingDirectory {
            package: name.to_string(),
            source,
        };
        let guard = WorkDirGuard::acquire().map_err(working_directory)?;
        let original = guard.original().to_path_buf();

        let result = self.lifecycle(name, package, observer);
        // Restored before the final cleanup so it runs where the package started
        let result = match (result, guard.restore()) {
            (Ok(status), Ok(())) => Ok(status),
            (Ok(_), Err(source)) => Err(working_directory(source)),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(source)) => {
                tracing::warn!(
                    "Could not restore the working directory after '{name}' failed: {source}"
                );
                Err(error)
            }
        };

        let outcome = match result {
            Ok(status) => {
                if !self.keep_temporaries {
                    observer.on_state(name, PackageState::Cleaning);
                    if let Err(source) = package.cleanup(self.ctx) {
                        observer.on_state(name, PackageState::Failed);
                        let error = lifecycle_error(name, Phase::Cleanup, source);
                        return Self::leave(name, &original, Err(error));
                    }
                }
                observer.on_state(name, PackageState::Done);
                tracing::info!("Finished {name}");
                Ok(status)
            }
            Err(error) => {
                observer.on_state(name, PackageState::Failed);
                if !self.keep_temporaries {
                    if let Err(e) = package.cleanup(self.ctx) {
                        tracing::warn!("Cleanup of '{name}' after failure also failed: {e}");
                    }
                }
                Err(error)
            }
        };
        Self::leave(name, &original, outcome)
    }

    /// Return to `original` after the final cleanup, which may move away too
    ///
    /// A restore failure replaces a success but never hides an earlier error.
    fn leave(
        name: &str,
        original: &Path,
        outcome: Result<PackageStatus, BuildError>,
    ) -> Result<PackageStatus, BuildError> {
        match (filesystem::set_current_dir(original), outcome) {
            (Ok(()), outcome) => outcome,
            (Err(source), Ok(_)) => Err(BuildError::WorkingDirectory {
                package: name.to_string(),
                source,
            }),
            (Err(source), Err(error)) => {
                tracing::warn!("{source}");
                Err(error)
            }
        }
    }

    /// Pre-clean, prepare and build; the caller restores the directory
    fn lifecycle(
        &self,
        name: &str,
        package: &dyn Package,
        observer: &mut dyn BuildObserver,
    ) -> Result<PackageStatus, BuildError> {
        observer.on_state(name, PackageState::Cleaning);
        package
            .cleanup(self.ctx)
            .map_err(|e| lifecycle_error(name, Phase::Cleanup, e))?;

        observer.on_state(name, PackageState::Preparing);
        tracing::info!("Preparing {name}");
        let ready = package
            .prepare(self.ctx)
            .map_err(|e| lifecycle_error(name, Phase::Prepare, e))?;
        if !ready {
            observer.on_state(name, PackageState::Skipped);
            tracing::info!("Nothing to do for {name}");
            return Ok(PackageStatus::Skipped);
        }

        observer.on_state(name, PackageState::Building);
        tracing::info!("Building {name}");
        package
            .build(self.ctx)
            .map_err(|e| lifecycle_error(name, Phase::Build, e))?;
        Ok(PackageStatus::Built)
    }
}

fn lifecycle_error(package: &str, phase: Phase, source: BoxError) -> BuildError {
    BuildError::Lifecycle {
        package: package.to_string(),
        phase,
        source,
    }
}
