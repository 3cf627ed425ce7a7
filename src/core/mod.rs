//! Core business logic module
//!
//! Package loading, dependency ordering and the build lifecycle. Side
//! effects are delegated to [`crate::infra`].
//!
//! # Submodules
//!
//! - [`context`] - Build context shared by all packages of one run
//! - [`package`] - Package lifecycle trait and definition files
//! - [`registry`] - Package discovery, loader and working set
//! - [`resolver`] - Dependency ordering
//! - [`builder`] - Build orchestration logic
//! - [`build_env`] - Child process environment
//! - [`recipe`] - Packages driven by definition files
//! - [`project_config`] - `tpbuild.toml` settings

pub mod build_env;
pub mod builder;
pub mod context;
pub mod package;
pub mod project_config;
pub mod recipe;
pub mod registry;
pub mod resolver;
