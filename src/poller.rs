//! Status polling
//!
//! The poller drives a task to a terminal state:
//!
//! ```text
//!            ┌──────── sleep(interval) ────────┐
//!            v                                 │
//!   query ──> queued / processing / <other> ───┘
//!     │
//!     ├──> exported ──> Ok(task)
//!     ├──> failed   ──> Err(RemoteTaskFailed)
//!     └──> non-2xx / bad body / no response ──> Err(..)  (no retry)
//! ```
//!
//! The loop has no iteration limit. Callers that need bounded latency pass a
//! [`CancellationToken`]; the in-flight request and the sleep both race it.

use crate::error::{Error, Result};
use crate::transport::{Auth, Transport};
use crate::types::{Event, Task, TaskId, TaskStatus, UserId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Queries task status until the task is exported or failed
pub struct StatusPoller<T: Transport> {
    transport: Arc<T>,
    events: Option<broadcast::Sender<Event>>,
}

impl<T: Transport> StatusPoller<T> {
    /// Create a poller over a shared transport
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            events: None,
        }
    }

    /// Publish a [`Event::StatusChanged`] for every status response
    pub fn with_events(mut self, events: broadcast::Sender<Event>) -> Self {
        self.events = Some(events);
        self
    }

    /// Status URL for a task: `{base_url}/{task_id}?user_id={user_id}`
    pub fn status_url(&self, task_id: &TaskId, user_id: &UserId) -> String {
        format!(
            "{}/{}?user_id={}",
            self.transport.base_url(),
            urlencoding::encode(task_id.as_str()),
            urlencoding::encode(user_id.as_str())
        )
    }

    /// Query the task status once
    ///
    /// # Errors
    /// - [`Error::Transport`] if no response was received
    /// - [`Error::StatusCheckFailed`] for a non-2xx status
    /// - [`Error::MalformedResponse`] if the body is not a task
    pub async fn check_status(&self, task_id: &TaskId, user_id: &UserId) -> Result<Task> {
        let url = self.status_url(task_id, user_id);
        let response = self.transport.get(&url, Auth::ApiKey).await?;

        if !response.is_success() {
            tracing::warn!(task_id = %task_id, status = response.status, "status check failed");
            return Err(Error::StatusCheckFailed {
                status: response.status,
                body: response.body_text(),
            });
        }

        serde_json::from_slice(&response.body).map_err(|e| Error::malformed("status", e))
    }

    /// Poll every `interval` until the task reaches a terminal state
    ///
    /// Returns the exported task. A `failed` task becomes
    /// [`Error::RemoteTaskFailed`]; any error from a single query ends polling
    /// immediately. A zero `interval` is rejected with [`Error::Config`].
    pub async fn poll_until_terminal(
        &self,
        task_id: &TaskId,
        user_id: &UserId,
        interval: Duration,
    ) -> Result<Task> {
        let mut last = None;
        self.poll_tracking(task_id, user_id, interval, None, &mut last)
            .await
    }

    /// [`StatusPoller::poll_until_terminal`] that stops with
    /// [`Error::Cancelled`] once `token` is cancelled
    pub async fn poll_until_terminal_with_cancel(
        &self,
        task_id: &TaskId,
        user_id: &UserId,
        interval: Duration,
        token: &CancellationToken,
    ) -> Result<Task> {
        let mut last = None;
        self.poll_tracking(task_id, user_id, interval, Some(token), &mut last)
            .await
    }

    /// Polling loop that leaves the most recent snapshot in `last`
    pub(crate) async fn poll_tracking(
        &self,
        task_id: &TaskId,
        user_id: &UserId,
        interval: Duration,
        cancel: Option<&CancellationToken>,
        last: &mut Option<Task>,
    ) -> Result<Task> {
        check_interval(interval)?;
        let mut polls: u64 = 0;

        loop {
            let task = cancellable(cancel, self.check_status(task_id, user_id)).await?;
            polls += 1;

            tracing::info!(
                task_id = %task.task_id,
                status = %task.status,
                success = task.success,
                total = task.total,
                polls,
                "task status"
            );
            if let Some(events) = &self.events {
                events
                    .send(Event::StatusChanged { task: task.clone() })
                    .ok();
            }
            *last = Some(task.clone());

            match task.status {
                TaskStatus::Exported => {
                    match &task.result_url {
                        Some(url) => {
                            tracing::info!(task_id = %task.task_id, url = %url, "results available")
                        }
                        None => {
                            tracing::warn!(task_id = %task.task_id, "task exported without a result URL")
                        }
                    }
                    return Ok(task);
                }
                TaskStatus::Failed => {
                    return Err(Error::RemoteTaskFailed {
                        task_id: task.task_id.to_string(),
                        success: task.success,
                        failure: task.failure,
                        total: task.total,
                    });
                }
                TaskStatus::Queued | TaskStatus::Processing | TaskStatus::Other(_) => {}
            }

            cancellable(cancel, async {
                tokio::time::sleep(interval).await;
                Ok(())
            })
            .await?;
        }
    }
}

/// A zero interval would query the service in a tight loop
pub(crate) fn check_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(Error::Config {
            message: "poll interval must be greater than zero".to_string(),
            key: Some("poll_interval".to_string()),
        });
    }
    Ok(())
}

/// Run `fut` unless `cancel` fires first
pub(crate) async fn cancellable<F, R>(cancel: Option<&CancellationToken>, fut: F) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    match cancel {
        None => fut.await,
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                result = fut => result,
            }
        }
    }
}
