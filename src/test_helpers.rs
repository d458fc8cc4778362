//! Shared test helpers: a scripted in-memory [`Transport`].

use crate::error::{Error, Result};
use crate::input::InputBatch;
use crate::transport::{Auth, BinaryResponse, RawResponse, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// A canned reply
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// Status code and body
    Body(u16, Vec<u8>),
    /// Status and the first bytes of a body, then the connection drops
    Truncated(u16, Vec<u8>),
    /// No response at all
    Unreachable,
}

impl Reply {
    pub(crate) fn json(status: u16, value: serde_json::Value) -> Self {
        Reply::Body(status, value.to_string().into_bytes())
    }

    pub(crate) fn text(status: u16, body: &str) -> Self {
        Reply::Body(status, body.as_bytes().to_vec())
    }
}

/// Build a task JSON body with the given status
pub(crate) fn task_json(status: &str, result_url: Option<&str>) -> serde_json::Value {
    let mut value = serde_json::json!({
        "task_id": "task-1",
        "user_id": "user-1",
        "status": status,
        "total": 3,
        "success": 1,
        "failure": 0,
        "created_at": "2025-01-10T08:00:00Z",
        "updated_at": "2025-01-10T08:00:05Z"
    });
    if let Some(url) = result_url {
        value["result_url"] = serde_json::Value::String(url.to_string());
    }
    value
}

/// Which transport method was called
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CallKind {
    Upload,
    Get,
    Binary,
}

/// One recorded call
#[derive(Clone, Debug)]
pub(crate) struct Call {
    pub(crate) kind: CallKind,
    pub(crate) url: String,
    pub(crate) auth: Option<Auth>,
    pub(crate) at: Instant,
}

/// Transport that replays scripted replies and records every call
///
/// When the status script runs dry the last status reply is repeated if
/// `repeat_last_status` is set, otherwise the call fails as unreachable.
pub(crate) struct ScriptedTransport {
    base_url: String,
    uploads: Mutex<VecDeque<Reply>>,
    statuses: Mutex<VecDeque<Reply>>,
    binaries: Mutex<VecDeque<Reply>>,
    last_status: Mutex<Option<Reply>>,
    repeat_last_status: bool,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            base_url: "https://api.test/tasks".to_string(),
            uploads: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            binaries: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(None),
            repeat_last_status: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn upload(self, reply: Reply) -> Self {
        self.uploads.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn status(self, reply: Reply) -> Self {
        self.statuses.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn binary(self, reply: Reply) -> Self {
        self.binaries.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn repeat_last_status(mut self) -> Self {
        self.repeat_last_status = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, kind: CallKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == kind)
            .count()
    }

    fn record(&self, kind: CallKind, url: &str, auth: Option<Auth>) {
        self.calls.lock().unwrap().push(Call {
            kind,
            url: url.to_string(),
            auth,
            at: Instant::now(),
        });
    }

    fn next_status(&self) -> Option<Reply> {
        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(reply) => {
                *self.last_status.lock().unwrap() = Some(reply.clone());
                Some(reply)
            }
            None if self.repeat_last_status => self.last_status.lock().unwrap().clone(),
            None => None,
        }
    }
}

fn unreachable_error() -> Error {
    Error::Transport {
        message: "scripted: connection refused".to_string(),
        timeout: false,
    }
}

fn into_raw(reply: Option<Reply>) -> Result<RawResponse> {
    match reply {
        Some(Reply::Body(status, body)) => Ok(RawResponse {
            status,
            body: Bytes::from(body),
        }),
        Some(Reply::Truncated(..)) | Some(Reply::Unreachable) | None => Err(unreachable_error()),
    }
}

/// Split a body into small chunks so sinks see more than one write
fn chunked(body: &[u8]) -> Vec<Result<Bytes>> {
    body.chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn upload(&self, _batch: &InputBatch) -> Result<RawResponse> {
        self.record(CallKind::Upload, &self.base_url, Some(Auth::ApiKey));
        let reply = self.uploads.lock().unwrap().pop_front();
        into_raw(reply)
    }

    async fn get(&self, url: &str, auth: Auth) -> Result<RawResponse> {
        self.record(CallKind::Get, url, Some(auth));
        into_raw(self.next_status())
    }

    async fn get_binary(&self, url: &str) -> Result<BinaryResponse> {
        self.record(CallKind::Binary, url, None);
        let reply = self.binaries.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Body(status, body)) => Ok(BinaryResponse {
                status,
                body: futures::stream::iter(chunked(&body)).boxed(),
            }),
            Some(Reply::Truncated(status, body)) => {
                let mut chunks = chunked(&body);
                chunks.push(Err(Error::Transport {
                    message: "scripted: connection reset mid-body".to_string(),
                    timeout: false,
                }));
                Ok(BinaryResponse {
                    status,
                    body: futures::stream::iter(chunks).boxed(),
                })
            }
            Some(Reply::Unreachable) | None => Err(unreachable_error()),
        }
    }
}
