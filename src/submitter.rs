//! Batch submission

use crate::error::{Error, Result};
use crate::input::InputBatch;
use crate::transport::Transport;
use crate::types::Task;
use std::sync::Arc;

/// Uploads an [`InputBatch`] and returns the task the service created
pub struct JobSubmitter<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> JobSubmitter<T> {
    /// Create a submitter over a shared transport
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Submit a batch
    ///
    /// The returned task's status is whatever the service reported; it is not
    /// assumed to be `queued`.
    ///
    /// # Errors
    /// - [`Error::Transport`] if no response was received
    /// - [`Error::RemoteRejected`] for a non-2xx status
    /// - [`Error::MalformedResponse`] if the body is not a task
    pub async fn submit(&self, batch: &InputBatch) -> Result<Task> {
        let response = self.transport.upload(batch).await?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "submission rejected");
            return Err(Error::RemoteRejected {
                status: response.status,
                body: response.body_text(),
            });
        }

        let task: Task =
            serde_json::from_slice(&response.body).map_err(|e| Error::malformed("submit", e))?;

        tracing::info!(
            task_id = %task.task_id,
            status = %task.status,
            numbers = batch.len(),
            "batch submitted"
        );

        Ok(task)
    }
}
