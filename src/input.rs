//! Input batches of phone numbers
//!
//! Numbers are opaque tokens here. Formatting and validity are the service's
//! business; the only local rules are that tokens are trimmed, blank lines are
//! skipped, and a batch holds at least one number.

use crate::error::{Error, Result};
use std::path::Path;

/// File name given to the uploaded multipart part
pub const UPLOAD_FILE_NAME: &str = "numbers.txt";

/// Ordered, non-empty list of phone numbers to check
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputBatch {
    numbers: Vec<String>,
}

impl InputBatch {
    /// Build a batch from individual numbers
    ///
    /// Entries are trimmed and blanks dropped. An entry containing line breaks
    /// yields one number per line, matching what gets uploaded.
    ///
    /// # Examples
    ///
    /// ```
    /// use numcheck::InputBatch;
    ///
    /// let batch = InputBatch::new(["+1234567890", " +9876543210 ", ""]).unwrap();
    /// assert_eq!(batch.len(), 2);
    /// assert_eq!(batch.to_body(), "+1234567890\n+9876543210");
    /// ```
    pub fn new<I, S>(numbers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let numbers: Vec<String> = numbers
            .into_iter()
            .flat_map(|n| {
                // one upload line per number
                n.as_ref()
                    .split(['\n', '\r'])
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();

        if numbers.is_empty() {
            return Err(Error::InvalidInput(
                "batch must contain at least one phone number".to_string(),
            ));
        }

        Ok(Self { numbers })
    }

    /// Build a batch from newline-separated text (CRLF tolerated)
    pub fn from_text(text: &str) -> Result<Self> {
        Self::new(text.lines())
    }

    /// Read a newline-separated input file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read input file '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_text(&content)
    }

    /// Write the batch as a newline-separated file
    pub async fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tokio::fs::write(path, self.to_body()).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write input file '{}': {}", path.display(), e),
            ))
        })?;
        tracing::debug!(path = %path.display(), numbers = self.len(), "wrote input file");
        Ok(())
    }

    /// Upload body: numbers joined by `\n`, no trailing newline
    pub fn to_body(&self) -> String {
        self.numbers.join("\n")
    }

    /// Numbers in submission order
    pub fn numbers(&self) -> &[String] {
        &self.numbers
    }

    /// Number of phone numbers in the batch
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    /// Always false; batches are never empty
    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}
