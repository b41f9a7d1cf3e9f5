//! Webhook server for carto-ci.
//!
//! Receives GitHub deliveries and hands them to the orchestrator.

pub mod error;
pub mod routes;
pub mod state;

pub use state::AppState;
