//! Core domain types and traits for the carto-ci build orchestrator.
//!
//! This crate contains:
//! - The build matrix and per-leg job specs
//! - Inbound webhook events
//! - Jobs and their completion outcomes
//! - Collaborator traits: build executor, status reporter, release publisher

pub mod error;
pub mod event;
pub mod executor;
pub mod id;
pub mod job;
pub mod matrix;
pub mod release;
pub mod status;

pub use error::{Error, Result};
pub use id::JobId;
