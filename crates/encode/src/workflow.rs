//! End-to-end workflow
//!
//! Resolved configuration in, finished encoding out: builds the scenario's plan,
//! starts the encoding and waits for its terminal status. A cancelled run
//! never starts an encoding.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::client::EncodingApi;
use crate::config::{Config, ConfigError};
use crate::http::BitmovinClient;
use crate::runner::{EncodingFailure, JobRunner, Outcome, PollPolicy, RunError};
use crate::scenario::{PlanError, Scenario, SubmittedPlan};

/// Error type for a workflow run
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create encoding resources: {0}")]
    Plan(#[from] PlanError),

    #[error("Cancelled before the encoding was started")]
    Cancelled,

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    EncodingFailed(#[from] EncodingFailure),
}

pub struct Workflow {
    config: Config,
    client: Arc<dyn EncodingApi>,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl Workflow {
    /// Workflow talking to the encoding API configured in `config`
    pub fn new(config: Config) -> Result<Self, WorkflowError> {
        let client = BitmovinClient::from_config(&config)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    pub fn with_client(config: Config, client: Arc<dyn EncodingApi>) -> Self {
        let policy = PollPolicy::from_config(&config);
        Self {
            config,
            client,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Build the scenario's plan, start exactly one encoding and wait for it
    pub async fn run(&self, scenario: Scenario) -> Result<SubmittedPlan, WorkflowError> {
        info!(scenario = %scenario, "creating encoding resources");
        let plan = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(WorkflowError::Cancelled),
            plan = scenario.submit(&self.config, self.client.clone()) => plan?,
        };

        let runner =
            JobRunner::new(self.client.clone(), self.policy).with_cancellation(self.cancel.clone());
        match runner.execute(&plan.encoding).await? {
            Outcome::Success => {
                info!(encoding = %plan.encoding.id, namespace = %plan.namespace, "encoding finished");
                Ok(plan)
            }
            Outcome::Failure(failure) => Err(failure.into()),
        }
    }
}
