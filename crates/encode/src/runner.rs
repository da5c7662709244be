//! Encoding job runner
//!
//! Starts an encoding and polls its status at a fixed interval until the service
//! reports FINISHED or ERROR. Optionally gives up after a timeout or when a
//! cancellation token fires; both bound the status requests as well as the
//! waits between them. Neither stops an encoding that was already started.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::client::{ApiError, EncodingApi};
use crate::config::{Config, DEFAULT_POLL_INTERVAL_SECS};
use crate::model::{Encoding, EncodingId, StartEncodingRequest, Status, Task};

/// How often to poll, and for how long at most
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// None waits as long as the encoding takes
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: None,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.poll_timeout(),
        }
    }
}

/// An encoding the service reported as ERROR
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Encoding failed: {}", .messages.join("; "))]
pub struct EncodingFailure {
    /// Texts of the ERROR messages of the final status, in reported order
    pub messages: Vec<String>,
}

/// Lifecycle of a started encoding as seen by the poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Submitted,
    Polling,
    Finished,
    Errored(EncodingFailure),
}

impl RunState {
    /// Next state after a status fetch; terminal states never change
    pub fn advance(self, task: &Task) -> RunState {
        match self {
            RunState::Finished | RunState::Errored(_) => self,
            RunState::Submitted | RunState::Polling => match task.status {
                Status::Finished => RunState::Finished,
                Status::Error => RunState::Errored(EncodingFailure {
                    messages: task.error_messages(),
                }),
                _ => RunState::Polling,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Finished | RunState::Errored(_))
    }
}

/// Final result of an encoding that reached a terminal status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(EncodingFailure),
}

/// Error type for running an encoding
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Gave up waiting for encoding {encoding} after {elapsed:?}")]
    TimedOut {
        encoding: EncodingId,
        elapsed: Duration,
    },

    #[error("Stopped waiting for encoding {0}: cancelled")]
    Cancelled(EncodingId),
}

pub struct JobRunner {
    client: Arc<dyn EncodingApi>,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl JobRunner {
    pub fn new(client: Arc<dyn EncodingApi>, policy: PollPolicy) -> Self {
        Self {
            client,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Start the encoding with default start options
    ///
    /// Nothing is sent once cancellation has been requested.
    pub async fn start(&self, encoding: &EncodingId) -> Result<(), RunError> {
        if self.cancel.is_cancelled() {
            return Err(RunError::Cancelled(encoding.clone()));
        }
        self.client
            .start_encoding(encoding, &StartEncodingRequest::default())
            .await?;
        info!(encoding = %encoding, "started encoding");
        Ok(())
    }

    /// Poll until the encoding reaches FINISHED or ERROR
    ///
    /// Every poll waits one interval before fetching. A failed fetch ends the
    /// wait; it is not retried. The timeout and the cancellation token apply to
    /// the fetch too, so a stalled request cannot outlive them.
    pub async fn await_completion(&self, encoding: &EncodingId) -> Result<Outcome, RunError> {
        let started = Instant::now();
        let deadline = self.policy.timeout.map(|timeout| started + timeout);
        let mut state = RunState::Submitted;

        loop {
            self.bounded(encoding, started, deadline, tokio::time::sleep(self.policy.interval))
                .await?;

            let task = self
                .bounded(
                    encoding,
                    started,
                    deadline,
                    self.client.encoding_status(encoding),
                )
                .await??;
            info!(
                "encoding status is {} (progress: {} %)",
                task.status,
                task.progress.unwrap_or(0)
            );

            state = state.advance(&task);
            match &state {
                RunState::Finished => return Ok(Outcome::Success),
                RunState::Errored(failure) => {
                    for message in &failure.messages {
                        error!("{}", message);
                    }
                    return Ok(Outcome::Failure(failure.clone()));
                }
                RunState::Submitted | RunState::Polling => {}
            }
        }
    }

    /// Start the encoding and wait for its terminal status
    pub async fn execute(&self, encoding: &Encoding) -> Result<Outcome, RunError> {
        self.start(&encoding.id).await?;
        self.await_completion(&encoding.id).await
    }

    /// Run `step` unless cancellation or the deadline comes first
    async fn bounded<F: Future>(
        &self,
        encoding: &EncodingId,
        started: Instant,
        deadline: Option<Instant>,
        step: F,
    ) -> Result<F::Output, RunError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RunError::Cancelled(encoding.clone())),
            _ = sleep_until_deadline(deadline) => Err(RunError::TimedOut {
                encoding: encoding.clone(),
                elapsed: started.elapsed(),
            }),
            output = step => Ok(output),
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{Call, FakeApi};
    use crate::model::{EncodingRequest, Message, MessageType};
    use proptest::prelude::*;

    async fn encoding(api: &FakeApi) -> Encoding {
        api.create_encoding(&EncodingRequest {
            name: "test".to_string(),
            description: None,
        })
        .await
        .unwrap()
    }

    fn runner(api: &Arc<FakeApi>, policy: PollPolicy) -> JobRunner {
        JobRunner::new(api.clone(), policy)
    }

    #[test]
    fn test_default_policy() {
        // Test that the default policy polls every 5 seconds without a timeout
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(policy.timeout, None);
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = Config::default();
        config.polling.interval_secs = Some(2);
        config.polling.timeout_secs = Some(60);

        let policy = PollPolicy::from_config(&config);
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.timeout, Some(Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_finished() {
        // Test that polling stops at the first FINISHED status
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        assert_eq!(encoding.id.as_str(), "enc-1");
        api.script_statuses([
            Task::new(Status::Running, 10),
            Task::new(Status::Running, 55),
            Task::new(Status::Finished, 100),
        ]);

        let started = Instant::now();
        let outcome = runner(&api, PollPolicy::default())
            .execute(&encoding)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(api.status_fetches(), 3);
        assert!(started.elapsed() >= Duration::from_secs(15));
        assert_eq!(api.calls()[1], Call::StartEncoding(encoding.id.clone()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_reports_only_error_messages() {
        // Test that the failure carries exactly the ERROR messages, in order
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        api.script_statuses([
            Task::new(Status::Queued, 0),
            Task::new(Status::Error, 30).with_messages(vec![
                Message::new(MessageType::Info, "a"),
                Message::new(MessageType::Error, "b"),
                Message::new(MessageType::Error, "c"),
            ]),
        ]);

        let outcome = runner(&api, PollPolicy::default())
            .execute(&encoding)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Failure(EncodingFailure {
                messages: vec!["b".to_string(), "c".to_string()]
            })
        );
        assert_eq!(api.status_fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_status_keeps_polling() {
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        api.script_statuses([
            Task::new(Status::Canceled, 0),
            Task::new(Status::Transferring, 99),
            Task::new(Status::Finished, 100),
        ]);

        let outcome = runner(&api, PollPolicy::default())
            .await_completion(&encoding.id)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(api.status_fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_gives_up() {
        // Test that the runner stops once the timeout passes without a terminal status
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        let policy = PollPolicy {
            interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(12)),
        };

        let err = runner(&api, policy).execute(&encoding).await.unwrap_err();
        match err {
            RunError::TimedOut { encoding: id, elapsed } => {
                assert_eq!(id, encoding.id);
                assert!(elapsed >= Duration::from_secs(12));
                assert!(elapsed < Duration::from_secs(15));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(api.status_fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_waiting() {
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });

        let err = runner(&api, PollPolicy::default())
            .with_cancellation(cancel)
            .execute(&encoding)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Cancelled(ref id) if *id == encoding.id));
        assert_eq!(api.status_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_covers_stalled_status_request() {
        // Test that a status request that never answers still ends at the timeout
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        api.stall_status();
        let policy = PollPolicy {
            interval: Duration::from_secs(5),
            timeout: Some(Duration::from_secs(12)),
        };

        let result = tokio::time::timeout(
            Duration::from_secs(3600),
            runner(&api, policy).execute(&encoding),
        )
        .await
        .expect("runner should give up at its own timeout");

        match result {
            Err(RunError::TimedOut { elapsed, .. }) => {
                assert!(elapsed >= Duration::from_secs(12));
                assert!(elapsed < Duration::from_secs(15));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(api.status_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_covers_stalled_status_request() {
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        api.stall_status();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            trigger.cancel();
        });

        let err = runner(&api, PollPolicy::default())
            .with_cancellation(cancel)
            .execute(&encoding)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Cancelled(_)));
        assert_eq!(api.status_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_sends_nothing() {
        // Test that a runner whose token already fired never starts the encoding
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = runner(&api, PollPolicy::default())
            .with_cancellation(cancel)
            .execute(&encoding)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Cancelled(ref id) if *id == encoding.id));
        assert!(!api
            .calls()
            .iter()
            .any(|c| matches!(c, Call::StartEncoding(_))));
        assert_eq!(api.status_fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_fetch_failure_propagates() {
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        api.script_statuses([Task::new(Status::Running, 5)]);
        api.fail_next_status(ApiError::Transport("connection reset".to_string()));

        let err = runner(&api, PollPolicy::default())
            .execute(&encoding)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Api(ApiError::Transport(_))));
        assert_eq!(api.status_fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejection_skips_polling() {
        let api = Arc::new(FakeApi::new());
        let encoding = encoding(&api).await;
        api.reject_start(ApiError::Rejected {
            status: 400,
            message: "encoding already started".to_string(),
        });

        let err = runner(&api, PollPolicy::default())
            .execute(&encoding)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Api(ApiError::Rejected { status: 400, .. })));
        assert_eq!(api.status_fetches(), 0);
    }

    fn status_strategy() -> impl Strategy<Value = Status> {
        prop_oneof![
            Just(Status::Created),
            Just(Status::Queued),
            Just(Status::Running),
            Just(Status::Finished),
            Just(Status::Error),
            Just(Status::Canceled),
            Just(Status::Transferring),
            Just(Status::Unknown),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // The run becomes terminal exactly at the first FINISHED or ERROR status
        // and stays in that state whatever comes after.
        #[test]
        fn prop_first_terminal_status_decides(
            statuses in prop::collection::vec(status_strategy(), 1..20)
        ) {
            let mut state = RunState::Submitted;
            let first_terminal = statuses.iter().position(|s| s.is_terminal());

            for (i, status) in statuses.iter().enumerate() {
                state = state.advance(&Task::new(*status, 0));
                match first_terminal {
                    Some(t) if i >= t => prop_assert!(state.is_terminal()),
                    _ => prop_assert_eq!(&state, &RunState::Polling),
                }
            }

            match first_terminal.map(|t| statuses[t]) {
                Some(Status::Finished) => prop_assert_eq!(state, RunState::Finished),
                Some(Status::Error) => prop_assert!(matches!(state, RunState::Errored(_))),
                _ => prop_assert_eq!(state, RunState::Polling),
            }
        }
    }
}
