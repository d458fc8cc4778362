//! Result artifact download
//!
//! The artifact is copied chunk by chunk; it is never held in memory whole.

use crate::error::{Error, Result};
use crate::poller::cancellable;
use crate::transport::Transport;
use futures::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Streams a task's result artifact to a sink
pub struct ResultFetcher<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> ResultFetcher<T> {
    /// Create a fetcher over a shared transport
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Copy the artifact at `result_url` into `sink`
    ///
    /// Returns the number of bytes written. The sink is flushed on success.
    ///
    /// # Errors
    /// - [`Error::DownloadFailed`] for a non-2xx status
    /// - [`Error::Transport`] if the connection fails, including mid-body
    /// - [`Error::Io`] if writing to the sink fails
    pub async fn fetch<W>(&self, result_url: &str, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut response = self.transport.get_binary(result_url).await?;

        if !response.is_success() {
            tracing::warn!(url = %result_url, status = response.status, "result download failed");
            return Err(Error::DownloadFailed {
                status: response.status,
            });
        }

        let mut written: u64 = 0;
        while let Some(chunk) = response.body.next().await {
            let chunk = chunk?;
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        tracing::debug!(url = %result_url, bytes = written, "result downloaded");
        Ok(written)
    }

    /// Download the artifact to `path`, creating parent directories
    ///
    /// The body is streamed into a sibling `.part` file that replaces `path`
    /// only once the download is complete. On failure the partial file is
    /// removed and an existing file at `path` is left untouched.
    pub async fn fetch_to_path(&self, result_url: &str, path: &Path) -> Result<u64> {
        self.fetch_to_path_inner(result_url, path, None).await
    }

    pub(crate) async fn fetch_to_path_inner(
        &self,
        result_url: &str,
        path: &Path,
        cancel: Option<&CancellationToken>,
    ) -> Result<u64> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory '{}': {}", parent.display(), e),
                ))
            })?;
        }

        let part_path = partial_path(path);
        let mut file = tokio::fs::File::create(&part_path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create output file '{}': {}", part_path.display(), e),
            ))
        })?;

        let result = cancellable(cancel, async {
            let written = self.fetch(result_url, &mut file).await?;
            file.sync_all().await?;
            Ok(written)
        })
        .await;
        drop(file);

        let result = match result {
            Ok(written) => tokio::fs::rename(&part_path, path)
                .await
                .map(|()| written)
                .map_err(|e| {
                    Error::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to move download to '{}': {}", path.display(), e),
                    ))
                }),
            Err(e) => Err(e),
        };

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&part_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %part_path.display(), error = %e, "failed to remove partial download");
                }
            }
        }

        result
    }
}

/// `results.xlsx` -> `results.xlsx.part`, in the same directory
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
