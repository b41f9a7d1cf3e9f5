//! KDL configuration parsing for carto-ci.
//!
//! This crate handles parsing of:
//! - The orchestrator configuration (carto-ci.kdl)
//! - Build command variable interpolation

pub mod error;
pub mod settings;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use settings::{
    BuildConfig, CiConfig, ReleaseConfig, ToolchainConfig, WorkerConfig, load_config,
    parse_config,
};
pub use variables::{VariableContext, VariableContextBuilder};
