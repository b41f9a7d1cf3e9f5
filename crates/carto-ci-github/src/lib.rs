//! GitHub integration for carto-ci.
//!
//! [`GitHubClient`] is both the commit status reporter and the release
//! publisher.

pub mod client;

pub use client::{GitHubClient, GitHubConfig, GitHubError};
