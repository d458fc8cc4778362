//! Error types for numcheck
//!
//! Every stage of the job lifecycle (submit, each status poll, the artifact
//! download) reports its first failure through [`Error`]. Nothing in this crate
//! retries on its own; callers that want a retry policy wrap the whole job with
//! [`crate::retry::with_retry`] or [`crate::JobClient::run_with_retry`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for numcheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of response-body bytes kept in error messages
pub(crate) const MAX_ERROR_BODY_BYTES: usize = 512;

/// Main error type for numcheck
#[derive(Debug, Error)]
pub enum Error {
    /// Connection, TLS, or timeout failure before a complete HTTP response arrived
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable description of the failure
        message: String,
        /// Whether the failure was a timeout
        timeout: bool,
    },

    /// The service answered the submission with a non-2xx status
    #[error("submission rejected with HTTP {status}: {body}")]
    RemoteRejected {
        /// HTTP status code returned by the service
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// The service answered a status query with a non-2xx status
    #[error("status check failed with HTTP {status}: {body}")]
    StatusCheckFailed {
        /// HTTP status code returned by the service
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Response body did not match the task schema
    #[error("malformed {context} response: {message}")]
    MalformedResponse {
        /// Stage that received the body ("submit" or "status")
        context: &'static str,
        /// Parser error message
        message: String,
    },

    /// The service reported the task as failed
    #[error("task {task_id} failed remotely ({success}/{total} succeeded, {failure} failed)")]
    RemoteTaskFailed {
        /// Identifier of the failed task
        task_id: String,
        /// Numbers checked successfully before the failure
        success: u64,
        /// Numbers that failed
        failure: u64,
        /// Total numbers in the task
        total: u64,
    },

    /// The artifact host answered with a non-2xx status
    #[error("result download failed with HTTP {status}")]
    DownloadFailed {
        /// HTTP status code returned by the artifact host
        status: u16,
    },

    /// The caller cancelled the job or its deadline elapsed
    #[error("job cancelled")]
    Cancelled,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_key")
        key: Option<String>,
    },

    /// The input batch could not be built
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error (reading input, writing the artifact)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Transport { timeout: true, .. } => "timeout",
            Error::Transport { .. } => "transport",
            Error::RemoteRejected { .. } => "remote_rejected",
            Error::StatusCheckFailed { .. } => "status_check_failed",
            Error::MalformedResponse { .. } => "malformed_response",
            Error::RemoteTaskFailed { .. } => "remote_task_failed",
            Error::DownloadFailed { .. } => "download_failed",
            Error::Cancelled => "cancelled",
            Error::Config { .. } => "config_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::Io(_) => "io_error",
        }
    }

    /// HTTP status carried by the error, if the service produced one
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::RemoteRejected { status, .. }
            | Error::StatusCheckFailed { status, .. }
            | Error::DownloadFailed { status } => Some(*status),
            _ => None,
        }
    }

    /// True when the service refused a submit or status request
    pub fn is_remote_rejection(&self) -> bool {
        matches!(
            self,
            Error::RemoteRejected { .. } | Error::StatusCheckFailed { .. }
        )
    }

    pub(crate) fn transport(context: &str, err: reqwest::Error) -> Self {
        let timeout = err.is_timeout();
        let message = if timeout {
            format!("{}: request timed out", context)
        } else if err.is_connect() {
            format!("{}: connection failed: {}", context, err)
        } else {
            format!("{}: {}", context, err)
        };
        Error::Transport { message, timeout }
    }

    pub(crate) fn malformed(context: &'static str, err: serde_json::Error) -> Self {
        Error::MalformedResponse {
            context,
            message: err.to_string(),
        }
    }
}

/// Serializable snapshot of an [`Error`]
///
/// [`Error`] wraps `std::io::Error` and so cannot be cloned; this is what gets
/// broadcast in [`crate::Event::Failed`].
///
/// ```json
/// {
///   "code": "download_failed",
///   "message": "result download failed with HTTP 404",
///   "status": 404
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (see [`Error::code`])
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status from the service, when there was one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl From<&Error> for ErrorDetail {
    fn from(error: &Error) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            status: error.http_status(),
        }
    }
}

/// Lossy UTF-8 view of a response body, truncated for error messages
pub(crate) fn truncate_body(body: &[u8]) -> String {
    let end = body.len().min(MAX_ERROR_BODY_BYTES);
    let mut text = String::from_utf8_lossy(&body[..end]).into_owned();
    if body.len() > MAX_ERROR_BODY_BYTES {
        text.push_str("...");
    }
    text
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        let cases: Vec<(Error, &str)> = vec![
            (
                Error::Transport {
                    message: "x".into(),
                    timeout: false,
                },
                "transport",
            ),
            (
                Error::Transport {
                    message: "x".into(),
                    timeout: true,
                },
                "timeout",
            ),
            (
                Error::RemoteRejected {
                    status: 500,
                    body: String::new(),
                },
                "remote_rejected",
            ),
            (
                Error::StatusCheckFailed {
                    status: 404,
                    body: String::new(),
                },
                "status_check_failed",
            ),
            (
                Error::MalformedResponse {
                    context: "submit",
                    message: "eof".into(),
                },
                "malformed_response",
            ),
            (Error::DownloadFailed { status: 403 }, "download_failed"),
            (Error::Cancelled, "cancelled"),
            (Error::InvalidInput("empty".into()), "invalid_input"),
        ];

        for (error, code) in cases {
            assert_eq!(error.code(), code, "wrong code for {error}");
        }
    }

    #[test]
    fn remote_rejection_covers_submit_and_status() {
        assert!(
            Error::RemoteRejected {
                status: 500,
                body: String::new()
            }
            .is_remote_rejection()
        );
        assert!(
            Error::StatusCheckFailed {
                status: 502,
                body: String::new()
            }
            .is_remote_rejection()
        );
        assert!(!Error::DownloadFailed { status: 500 }.is_remote_rejection());
    }

    #[test]
    fn remote_task_failed_message_includes_counters() {
        let error = Error::RemoteTaskFailed {
            task_id: "t-1".into(),
            success: 2,
            failure: 1,
            total: 3,
        };
        assert_eq!(
            error.to_string(),
            "task t-1 failed remotely (2/3 succeeded, 1 failed)"
        );
    }

    #[test]
    fn error_detail_carries_status() {
        let detail = ErrorDetail::from(&Error::DownloadFailed { status: 404 });
        assert_eq!(detail.code, "download_failed");
        assert_eq!(detail.status, Some(404));

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["status"], 404);

        let detail = ErrorDetail::from(&Error::Cancelled);
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("status").is_none(), "status should be omitted");
    }

    #[test]
    fn truncate_body_limits_length() {
        let body = vec![b'a'; MAX_ERROR_BODY_BYTES + 100];
        let text = truncate_body(&body);
        assert_eq!(text.len(), MAX_ERROR_BODY_BYTES + 3);
        assert!(text.ends_with("..."));

        assert_eq!(truncate_body(b"short"), "short");
    }
}
