//! # numcheck
//!
//! Async client for the checknumber.ai batch phone-number verification service.
//!
//! A job has three stages, run strictly in order:
//!
//! 1. **Submit** - upload a batch of numbers, get back a task
//! 2. **Poll** - query the task every `interval` until it is `exported` or `failed`
//! 3. **Download** - stream the result spreadsheet to disk, if the task has one
//!
//! The first failure ends the job. Nothing is retried implicitly; wrap a job with
//! [`JobClient::run_with_retry`] to retry transient failures.
//!
//! ## Quick Start
//!
//! ```no_run
//! use numcheck::{Config, InputBatch, JobClient, Outcome};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = JobClient::new(Config::from_env()?)?;
//!
//!     // Subscribe to events
//!     let mut events = client.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let batch = InputBatch::new(["+1234567890", "+9876543210"])?;
//!     match client.run(&batch, Duration::from_secs(5), None).await {
//!         Outcome::Completed { artifact: Some(path), .. } => println!("saved {}", path.display()),
//!         Outcome::Completed { artifact: None, .. } => println!("no results to download"),
//!         Outcome::Failed(reason) => eprintln!("{}", reason),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Job orchestration
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Result artifact download
pub mod fetcher;
/// Input batches
pub mod input;
/// Status polling
pub mod poller;
/// Retry logic with exponential backoff
pub mod retry;
/// Batch submission
pub mod submitter;
/// HTTP transport
pub mod transport;
/// Core types and events
pub mod types;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use client::JobClient;
pub use config::{Config, RetryConfig};
pub use error::{Error, ErrorDetail, Result};
pub use fetcher::ResultFetcher;
pub use input::InputBatch;
pub use poller::StatusPoller;
pub use retry::IsRetryable;
pub use submitter::JobSubmitter;
pub use transport::{Auth, BinaryResponse, ByteStream, HttpTransport, RawResponse, Transport};
pub use types::{Event, FailureReason, Outcome, Stage, Task, TaskId, TaskStatus, UserId};
pub use tokio_util::sync::CancellationToken;
