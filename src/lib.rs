//! tpbuild - Dependency-aware builder for third-party native libraries
//!
//! Builds a set of libraries from source archives into a shared
//! installation prefix, in an order consistent with their dependencies.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Package loading, ordering and the build lifecycle
//! - [`infra`] - Infrastructure layer (network, filesystem, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
