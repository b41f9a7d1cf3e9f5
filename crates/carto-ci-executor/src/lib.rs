//! Build executors for carto-ci.
//!
//! Provides the Docker executor that cross-compiles one matrix leg inside a
//! toolchain container.

pub mod docker;

pub use carto_ci_core::executor::{BuildExecutor, BuildOutput, SourceRef};
pub use docker::{DockerBuildExecutor, DockerBuildSettings};
