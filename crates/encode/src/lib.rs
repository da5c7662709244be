//! Cloud encoding orchestration
//!
//! Creates the resources of a remote encoding (input, output, codec
//! configurations, streams, muxings) in dependency order, starts it and polls
//! its status until it finishes or fails.

pub mod client;
pub mod http;
pub mod model;
pub mod plan;
pub mod runner;
pub mod scenario;
pub mod workflow;

#[cfg(test)]
mod fake;

pub use cloud_encode_config as config;
pub use cloud_encode_config::Config;
pub use client::{ApiError, EncodingApi};
pub use http::BitmovinClient;
pub use plan::{build_absolute_path, OutputPaths, PlanBuilder};
pub use runner::{EncodingFailure, JobRunner, Outcome, PollPolicy, RunError, RunState};
pub use scenario::{PlanError, Scenario, SubmittedPlan};
pub use workflow::{Workflow, WorkflowError};
