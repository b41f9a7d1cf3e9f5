//! Event orchestration and job scheduling for carto-ci.
//!
//! The orchestrator turns webhook events into jobs and pushes them onto an
//! in-memory queue; a worker drains the queue and runs each job as its own
//! task, bounded by a concurrency limit.

pub mod orchestrator;
pub mod queue;
pub mod runner;
pub mod worker;

#[cfg(test)]
mod testing;

pub use orchestrator::{Dispatch, Orchestrator};
pub use queue::{JobQueue, JobReceiver};
pub use runner::JobRunner;
pub use worker::Worker;
