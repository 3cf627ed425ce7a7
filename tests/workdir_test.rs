//! Working directory restoration around package lifecycles
//!
//! Kept in its own test binary with a single test: it changes the process
//! working directory, which would race with any other test in the process.

#![cfg(unix)]

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use tempfile::TempDir;
use tpbuild::core::builder::{BuildOrchestrator, NoopObserver};
use tpbuild::core::context::{BuildContext, BuildContextBuilder, TargetSystem, Toolset};
use tpbuild::core::package::Package;
use tpbuild::core::registry::PackageRegistry;
use tpbuild::error::BoxError;

/// Moves into its own directory in every phase and records where each
/// phase started
struct Wanderer {
    dir: PathBuf,
    fail_build: bool,
    /// Directory deleted during `build`, making it impossible to return there
    doomed: Option<PathBuf>,
    seen: Rc<RefCell<Vec<PathBuf>>>,
}

impl Wanderer {
    fn wander(&self) -> Result<(), BoxError> {
        self.seen.borrow_mut().push(std::env::current_dir()?);
        std::fs::create_dir_all(&self.dir)?;
        std::env::set_current_dir(&self.dir)?;
        Ok(())
    }
}

impl Package for Wanderer {
    fn dependencies(&self) -> &[String] {
        &[]
    }

    fn prepare(&self, _ctx: &BuildContext) -> Result<bool, BoxError> {
        self.wander()?;
        Ok(true)
    }

    fn build(&self, _ctx: &BuildContext) -> Result<(), BoxError> {
        self.wander()?;
        if let Some(doomed) = &self.doomed {
            std::fs::remove_dir_all(doomed)?;
        }
        if self.fail_build {
            return Err("build broke".into());
        }
        Ok(())
    }

    fn cleanup(&self, _ctx: &BuildContext) -> Result<(), BoxError> {
        self.wander()
    }
}

#[test]
fn test_working_directory_is_restored_between_phases() {
    let temp = TempDir::new().unwrap();
    let start = temp.path().canonicalize().unwrap();
    std::env::set_current_dir(&start).unwrap();

    let ctx = BuildContextBuilder::new(Toolset::Gcc, start.join("packages"))
        .target_system(TargetSystem::Linux)
        .install_prefix(start.join("prefix"))
        .build()
        .unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut registry = PackageRegistry::new();
    registry.register(
        "wanderer",
        Rc::new(Wanderer {
            dir: start.join("elsewhere"),
            fail_build: false,
            doomed: None,
            seen: Rc::clone(&seen),
        }),
    );
    registry.register(
        "broken",
        Rc::new(Wanderer {
            dir: start.join("broken"),
            fail_build: true,
            doomed: None,
            seen: Rc::clone(&seen),
        }),
    );
    registry.register(
        "follower",
        Rc::new(Wanderer {
            dir: start.join("follower"),
            fail_build: false,
            doomed: None,
            seen: Rc::clone(&seen),
        }),
    );
    registry.register(
        "vandal",
        Rc::new(Wanderer {
            dir: start.join("vandal"),
            fail_build: true,
            doomed: Some(start.join("doomed")),
            seen: Rc::clone(&seen),
        }),
    );

    let orchestrator = BuildOrchestrator::new(&ctx);
    orchestrator
        .run(&registry, &["wanderer"], &mut NoopObserver)
        .unwrap();
    assert_eq!(std::env::current_dir().unwrap(), start);
    // Lifecycle calls share one directory; only the final cleanup is
    // guaranteed to start where the package started.
    let elsewhere = start.join("elsewhere");
    assert_eq!(
        *seen.borrow(),
        vec![start.clone(), elsewhere.clone(), elsewhere.clone(), start.clone()]
    );

    // The final cleanup moves away as well; the next package must still
    // start from the original directory. Requests load in front, so
    // `wanderer` runs first.
    seen.borrow_mut().clear();
    orchestrator
        .run(&registry, &["follower", "wanderer"], &mut NoopObserver)
        .unwrap();
    assert_eq!(std::env::current_dir().unwrap(), start);
    let follower = start.join("follower");
    assert_eq!(
        *seen.borrow(),
        vec![
            start.clone(),
            elsewhere.clone(),
            elsewhere,
            start.clone(),
            start.clone(),
            follower.clone(),
            follower,
            start.clone(),
        ]
    );

    seen.borrow_mut().clear();
    let err = orchestrator
        .run(&registry, &["broken"], &mut NoopObserver)
        .unwrap_err();
    assert!(err.to_string().contains("build broke"));
    assert_eq!(std::env::current_dir().unwrap(), start);
    let broken = start.join("broken");
    assert_eq!(
        *seen.borrow(),
        vec![start.clone(), broken.clone(), broken, start.clone()]
    );

    // Losing the original directory must not hide the build error or skip
    // the cleanup that follows it.
    let doomed = start.join("doomed");
    std::fs::create_dir_all(&doomed).unwrap();
    std::env::set_current_dir(&doomed).unwrap();
    seen.borrow_mut().clear();
    let err = orchestrator
        .run(&registry, &["vandal"], &mut NoopObserver)
        .unwrap_err();
    assert!(err.to_string().contains("build broke"), "{err}");
    assert_eq!(seen.borrow().len(), 4, "final cleanup must still run");
    std::env::set_current_dir(&start).unwrap();
}
