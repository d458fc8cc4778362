//! Core types for numcheck

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorDetail};

/// Identifier the service assigns to a submitted task
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of the account a task belongs to
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new UserId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Task status as reported by the service
///
/// Only `Exported` and `Failed` are terminal. The service may introduce
/// intermediate states at any time; those land in `Other` and are treated
/// like `Processing`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    /// Accepted, waiting for a worker
    Queued,
    /// Numbers are being checked
    Processing,
    /// Finished; results are available at `result_url`
    Exported,
    /// Finished unsuccessfully
    Failed,
    /// Any status string not listed above
    Other(String),
}

impl TaskStatus {
    /// Wire representation of this status
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Exported => "exported",
            TaskStatus::Failed => "failed",
            TaskStatus::Other(s) => s,
        }
    }

    /// Whether polling stops at this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Exported | TaskStatus::Failed)
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => TaskStatus::Queued,
            "processing" => TaskStatus::Processing,
            "exported" => TaskStatus::Exported,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Other(s),
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        TaskStatus::from(s.to_string())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a remote verification task
///
/// Every status response produces a fresh `Task`; snapshots are never merged
/// or patched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub task_id: TaskId,
    /// Owning account
    pub user_id: UserId,
    /// Current status
    pub status: TaskStatus,
    /// Numbers in the task
    #[serde(default)]
    pub total: u64,
    /// Numbers checked successfully so far
    #[serde(default)]
    pub success: u64,
    /// Numbers that could not be checked
    #[serde(default)]
    pub failure: u64,
    /// Location of the result spreadsheet, once exported
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub result_url: Option<String>,
    /// Creation time as reported by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update time as reported by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Task {
    /// Whether the task reached `exported` or `failed`
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a result artifact can be downloaded
    pub fn has_result(&self) -> bool {
        self.result_url.is_some()
    }

    /// Fraction of numbers processed (succeeded or failed), 0.0 when empty
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.success.saturating_add(self.failure) as f64 / self.total as f64).min(1.0)
    }

    /// `created_at` parsed as RFC 3339, if the service sent a parseable value
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref())
    }

    /// `updated_at` parsed as RFC 3339, if the service sent a parseable value
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at.as_deref())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Lifecycle stage of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Uploading the input batch
    Submit,
    /// Waiting for a terminal status
    Poll,
    /// Fetching the result artifact
    Download,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Submit => "submit",
            Stage::Poll => "poll",
            Stage::Download => "download",
        })
    }
}

/// Final result of [`crate::JobClient::run`]
#[derive(Debug)]
pub enum Outcome {
    /// The task was exported
    Completed {
        /// Final task snapshot
        task: Task,
        /// Where the artifact was written; `None` when the task had no result
        artifact: Option<PathBuf>,
    },
    /// A stage failed
    Failed(FailureReason),
}

impl Outcome {
    /// Whether the job completed
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed { .. })
    }

    /// Path of the downloaded artifact, if any
    pub fn artifact(&self) -> Option<&Path> {
        match self {
            Outcome::Completed { artifact, .. } => artifact.as_deref(),
            Outcome::Failed(_) => None,
        }
    }

    /// The error behind a failed outcome
    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::Completed { .. } => None,
            Outcome::Failed(reason) => Some(&reason.error),
        }
    }

    /// Convert into a `Result`, dropping the failure context
    pub fn into_result(self) -> crate::Result<(Task, Option<PathBuf>)> {
        match self {
            Outcome::Completed { task, artifact } => Ok((task, artifact)),
            Outcome::Failed(reason) => Err(reason.error),
        }
    }
}

/// Why a job failed and where
#[derive(Debug)]
pub struct FailureReason {
    /// Stage that produced the error
    pub stage: Stage,
    /// The first error encountered
    pub error: Error,
    /// Last task snapshot seen before the failure
    pub last_task: Option<Task>,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for FailureReason {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Event emitted during a job's lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The batch was accepted
    Submitted {
        /// Task as returned by the submission
        task: Task,
    },

    /// A status response arrived
    StatusChanged {
        /// Fresh task snapshot
        task: Task,
    },

    /// Artifact download started
    Downloading {
        /// Task ID
        task_id: TaskId,
        /// Artifact URL
        url: String,
    },

    /// Artifact written to disk
    Downloaded {
        /// Task ID
        task_id: TaskId,
        /// Destination path
        path: PathBuf,
        /// Bytes written
        bytes: u64,
    },

    /// A stage failed
    Failed {
        /// Stage that failed
        stage: Stage,
        /// Error details
        error: ErrorDetail,
    },
}
