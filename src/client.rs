//! Job orchestration: submit, poll to a terminal state, fetch the artifact
//!
//! Stages run strictly in order and the first failure ends the job. Each
//! [`JobClient::run`] call owns its task snapshots, so one client can be shared
//! (e.g. behind an `Arc`) by several concurrent jobs.

use crate::config::{Config, RetryConfig};
use crate::error::{ErrorDetail, Result};
use crate::fetcher::ResultFetcher;
use crate::input::InputBatch;
use crate::poller::{StatusPoller, cancellable, check_interval};
use crate::retry::with_retry;
use crate::submitter::JobSubmitter;
use crate::transport::{HttpTransport, Transport};
use crate::types::{Event, FailureReason, Outcome, Stage, Task};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Capacity of the event channel; slow subscribers lag rather than block
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Client for the batch verification service
///
/// # Example
///
/// ```no_run
/// use numcheck::{Config, InputBatch, JobClient, Outcome};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = JobClient::new(Config::new("your-api-key"))?;
/// let batch = InputBatch::new(["+1234567890", "+9876543210"])?;
///
/// match client.run_with_defaults(&batch).await {
///     Outcome::Completed { task, artifact } => {
///         println!("{} numbers checked, results at {:?}", task.total, artifact);
///     }
///     Outcome::Failed(reason) => eprintln!("{}", reason),
/// }
/// # Ok(())
/// # }
/// ```
pub struct JobClient<T: Transport = HttpTransport> {
    config: Config,
    transport: Arc<T>,
    submitter: JobSubmitter<T>,
    poller: StatusPoller<T>,
    fetcher: ResultFetcher<T>,
    event_tx: broadcast::Sender<Event>,
}

impl JobClient<HttpTransport> {
    /// Create a client talking to the service over HTTP
    ///
    /// # Errors
    /// Returns [`crate::Error::Config`] if the configuration is invalid
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> JobClient<T> {
    /// Create a client over a custom transport
    pub fn with_transport(config: Config, transport: T) -> Self {
        let transport = Arc::new(transport);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            submitter: JobSubmitter::new(transport.clone()),
            poller: StatusPoller::new(transport.clone()).with_events(event_tx.clone()),
            fetcher: ResultFetcher::new(transport.clone()),
            transport,
            config,
            event_tx,
        }
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Client configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submission stage, for callers driving the lifecycle by hand
    pub fn submitter(&self) -> &JobSubmitter<T> {
        &self.submitter
    }

    /// Polling stage, e.g. to resume watching a task submitted earlier
    pub fn poller(&self) -> &StatusPoller<T> {
        &self.poller
    }

    /// Download stage
    pub fn fetcher(&self) -> &ResultFetcher<T> {
        &self.fetcher
    }

    /// Submit `batch`, poll every `interval` until the task is terminal, then
    /// download the artifact to `output` (or the configured output path)
    ///
    /// A task that is exported without a result URL completes with no artifact.
    /// A zero `interval` fails with [`crate::Error::Config`] before anything is
    /// submitted.
    pub async fn run(
        &self,
        batch: &InputBatch,
        interval: Duration,
        output: Option<&Path>,
    ) -> Outcome {
        self.run_inner(batch, interval, output, None).await
    }

    /// [`JobClient::run`] with the configured poll interval and output path
    pub async fn run_with_defaults(&self, batch: &InputBatch) -> Outcome {
        self.run(batch, self.config.poll_interval, None).await
    }

    /// [`JobClient::run`] that fails with [`crate::Error::Cancelled`] once
    /// `token` is cancelled, whichever stage is in progress
    pub async fn run_with_cancel(
        &self,
        batch: &InputBatch,
        interval: Duration,
        output: Option<&Path>,
        token: &CancellationToken,
    ) -> Outcome {
        self.run_inner(batch, interval, output, Some(token)).await
    }

    /// [`JobClient::run`] bounded by a total deadline
    pub async fn run_with_deadline(
        &self,
        batch: &InputBatch,
        interval: Duration,
        output: Option<&Path>,
        deadline: Duration,
    ) -> Outcome {
        let token = CancellationToken::new();
        let timer = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                tracing::warn!(deadline_secs = deadline.as_secs_f64(), "job deadline elapsed");
                token.cancel();
            })
        };

        let outcome = self.run_with_cancel(batch, interval, output, &token).await;
        timer.abort();
        outcome
    }

    /// Run the whole job again after transient failures
    ///
    /// Each attempt starts from submission. Failed tasks, malformed responses,
    /// cancellation and 4xx answers are returned immediately.
    pub async fn run_with_retry(
        &self,
        batch: &InputBatch,
        interval: Duration,
        output: Option<&Path>,
        retry: &RetryConfig,
    ) -> Outcome {
        let result = with_retry(retry, || async move {
            match self.run(batch, interval, output).await {
                Outcome::Completed { task, artifact } => Ok((task, artifact)),
                Outcome::Failed(reason) => Err(reason),
            }
        })
        .await;

        match result {
            Ok((task, artifact)) => Outcome::Completed { task, artifact },
            Err(reason) => Outcome::Failed(reason),
        }
    }

    async fn run_inner(
        &self,
        batch: &InputBatch,
        interval: Duration,
        output: Option<&Path>,
        cancel: Option<&CancellationToken>,
    ) -> Outcome {
        if let Err(error) = check_interval(interval) {
            return self.fail(Stage::Submit, error, None);
        }

        let task = match cancellable(cancel, self.submitter.submit(batch)).await {
            Ok(task) => task,
            Err(error) => return self.fail(Stage::Submit, error, None),
        };
        self.publish(Event::Submitted { task: task.clone() });

        let mut last = Some(task.clone());
        let task = match self
            .poller
            .poll_tracking(&task.task_id, &task.user_id, interval, cancel, &mut last)
            .await
        {
            Ok(task) => task,
            Err(error) => return self.fail(Stage::Poll, error, last),
        };

        let Some(url) = task.result_url.clone() else {
            tracing::info!(task_id = %task.task_id, "task completed without a result artifact");
            return Outcome::Completed {
                task,
                artifact: None,
            };
        };

        let path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.output_path.clone());

        self.publish(Event::Downloading {
            task_id: task.task_id.clone(),
            url: url.clone(),
        });

        match self.fetcher.fetch_to_path_inner(&url, &path, cancel).await {
            Ok(bytes) => {
                tracing::info!(
                    task_id = %task.task_id,
                    path = %path.display(),
                    bytes,
                    "results saved"
                );
                self.publish(Event::Downloaded {
                    task_id: task.task_id.clone(),
                    path: path.clone(),
                    bytes,
                });
                Outcome::Completed {
                    task,
                    artifact: Some(path),
                }
            }
            Err(error) => self.fail(Stage::Download, error, Some(task)),
        }
    }

    fn fail(&self, stage: Stage, error: crate::Error, last_task: Option<Task>) -> Outcome {
        tracing::error!(stage = %stage, error = %error, "job failed");
        self.publish(Event::Failed {
            stage,
            error: ErrorDetail::from(&error),
        });
        Outcome::Failed(FailureReason {
            stage,
            error,
            last_task,
        })
    }

    fn publish(&self, event: Event) {
        // no subscribers is fine
        self.event_tx.send(event).ok();
    }
}

impl<T: Transport> std::fmt::Debug for JobClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobClient")
            .field("base_url", &self.transport.base_url())
            .field("poll_interval", &self.config.poll_interval)
            .finish_non_exhaustive()
    }
}
