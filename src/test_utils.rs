//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest, plus an
//! in-memory package that records its lifecycle calls.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid package name (lowercase alphanumeric with hyphens)
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,30}[a-z0-9]?".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Generate an acyclic package graph of up to `max` packages
    ///
    /// Package `pkgN` may only depend on packages with a smaller N, so the
    /// graph cannot contain a cycle. Packages are then shuffled so the
    /// insertion order does not already match a valid build order.
    pub fn acyclic_graph(max: usize) -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
        (1..=max)
            .prop_flat_map(|count| {
                let deps = (0..count)
                    .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(4)))
                    .collect::<Vec<_>>();
                (Just(count), deps)
            })
            .prop_map(|(_, deps)| {
                deps.into_iter()
                    .enumerate()
                    .map(|(i, dep_indices)| {
                        let deps = dep_indices
                            .into_iter()
                            .filter(|&d| d < i)
                            .map(|d| format!("pkg{d}"))
                            .collect();
                        (format!("pkg{i}"), deps)
                    })
                    .collect::<Vec<_>>()
            })
            .prop_shuffle()
    }
}

#[cfg(test)]
pub mod fakes {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::core::context::BuildContext;
    use crate::core::package::Package;
    use crate::error::BoxError;

    /// Shared record of lifecycle calls, e.g. `"zlib:prepare"`
    pub type CallLog = Rc<RefCell<Vec<String>>>;

    /// Package with scripted lifecycle results
    #[derive(Debug, Default)]
    pub struct FakePackage {
        name: String,
        dependencies: Vec<String>,
        log: CallLog,
        prepare_result: bool,
        fail_prepare: bool,
        fail_build: bool,
        fail_cleanup: bool,
        cleanups: Cell<usize>,
    }

    impl FakePackage {
        pub fn new(dependencies: &[&str]) -> Self {
            Self {
                dependencies: dependencies.iter().map(ToString::to_string).collect(),
                prepare_result: true,
                ..Self::default()
            }
        }

        /// Record calls into `log` under `name`
        #[must_use]
        pub fn logged(mut self, name: &str, log: &CallLog) -> Self {
            self.name = name.to_string();
            self.log = Rc::clone(log);
            self
        }

        #[must_use]
        pub fn nothing_to_do(mut self) -> Self {
            self.prepare_result = false;
            self
        }

        #[must_use]
        pub fn failing_prepare(mut self) -> Self {
            self.fail_prepare = true;
            self
        }

        #[must_use]
        pub fn failing_build(mut self) -> Self {
            self.fail_build = true;
            self
        }

        #[must_use]
        pub fn failing_cleanup(mut self) -> Self {
            self.fail_cleanup = true;
            self
        }

        fn record(&self, call: &str) {
            self.log.borrow_mut().push(format!("{}:{call}", self.name));
        }
    }

    impl Package for FakePackage {
        fn dependencies(&self) -> &[String] {
            &self.dependencies
        }

        fn prepare(&self, _ctx: &BuildContext) -> Result<bool, BoxError> {
            self.record("prepare");
            if self.fail_prepare {
                return Err(format!("{} prepare failed", self.name).into());
            }
            Ok(self.prepare_result)
        }

        fn build(&self, _ctx: &BuildContext) -> Result<(), BoxError> {
            self.record("build");
            if self.fail_build {
                return Err(format!("{} build failed", self.name).into());
            }
            Ok(())
        }

        fn cleanup(&self, _ctx: &BuildContext) -> Result<(), BoxError> {
            self.record("cleanup");
            let calls = self.cleanups.get() + 1;
            self.cleanups.set(calls);
            // The pre-clean always succeeds so the failure hits the post-build cleanup
            if self.fail_cleanup && calls > 1 {
                return Err(format!("{} cleanup failed", self.name).into());
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn test_acyclic_graph_generator(graph in acyclic_graph(10)) {
            prop_assert!(!graph.is_empty());
            for (name, deps) in &graph {
                let own: usize = name.trim_start_matches("pkg").parse().unwrap();
                for dep in deps {
                    let dep: usize = dep.trim_start_matches("pkg").parse().unwrap();
                    prop_assert!(dep < own);
                }
            }
        }
    }
}
