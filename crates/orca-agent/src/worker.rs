//! Worker transports
//!
//! Each transport is stateless from the orchestrator's point of view: it
//! receives a complete request and returns a raw response. Validation,
//! timeouts and capability checks live in the dispatcher.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use orca_core::{OrcaError, ProgressReport, Result, WorkerId};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::protocol::{WorkerRequest, WorkerResponse};

/// A stateless, single-invocation unit of specialized capability
#[async_trait]
pub trait Worker: Send + Sync {
    fn id(&self) -> WorkerId;

    async fn invoke(&self, request: &WorkerRequest) -> Result<WorkerResponse>;
}

/// One canned reply of a scripted worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptedReply {
    Respond { response: WorkerResponse },
    /// Fail at the transport level
    Fail { message: String },
    /// Sleep before responding (drives timeout paths)
    Delay { millis: u64, response: WorkerResponse },
}

impl From<WorkerResponse> for ScriptedReply {
    fn from(response: WorkerResponse) -> Self {
        Self::Respond { response }
    }
}

/// In-memory worker replaying a queue of canned replies
///
/// Once the queue is drained the fallback response, if any, is repeated.
/// Every request received is recorded for inspection.
pub struct ScriptedWorker {
    id: WorkerId,
    script: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<WorkerResponse>,
    received: Mutex<Vec<WorkerRequest>>,
}

impl ScriptedWorker {
    pub fn new(id: WorkerId, replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            id,
            script: Mutex::new(replies.into_iter().collect()),
            fallback: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// A worker that always answers with the same response
    pub fn repeating(id: WorkerId, response: WorkerResponse) -> Self {
        Self::new(id, Vec::new()).with_fallback(response)
    }

    pub fn with_fallback(mut self, response: WorkerResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Requests received so far, oldest first
    pub async fn requests(&self) -> Vec<WorkerRequest> {
        self.received.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }
}

#[async_trait]
impl Worker for ScriptedWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    async fn invoke(&self, request: &WorkerRequest) -> Result<WorkerResponse> {
        self.received.lock().await.push(request.clone());

        let next = self.script.lock().await.pop_front();
        match next {
            Some(ScriptedReply::Respond { response }) => Ok(response),
            Some(ScriptedReply::Fail { message }) => Err(OrcaError::Transport {
                worker: self.id,
                message,
            }),
            Some(ScriptedReply::Delay { millis, response }) => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(response)
            }
            None => self.fallback.clone().ok_or_else(|| OrcaError::Transport {
                worker: self.id,
                message: "script exhausted".to_string(),
            }),
        }
    }
}

/// Worker backed by a subprocess speaking JSON over stdin/stdout
///
/// When stdout is not a JSON response, it is taken as free-form output and
/// the progress report is read from a fenced ```progress block.
pub struct CommandWorker {
    id: WorkerId,
    program: String,
    args: Vec<String>,
}

impl CommandWorker {
    pub fn new(id: WorkerId, program: impl Into<String>) -> Self {
        Self {
            id,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn parse_stdout(&self, stdout: &str) -> WorkerResponse {
        match serde_json::from_str::<WorkerResponse>(stdout.trim()) {
            Ok(response) => response,
            Err(_) => {
                tracing::debug!(worker = %self.id, "stdout is not JSON, reading progress block");
                WorkerResponse {
                    output: stdout.to_string(),
                    progress_report: ProgressReport::parse_block(stdout),
                    ..Default::default()
                }
            }
        }
    }
}

#[async_trait]
impl Worker for CommandWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    async fn invoke(&self, request: &WorkerRequest) -> Result<WorkerResponse> {
        let transport = |message: String| OrcaError::Transport {
            worker: self.id,
            message,
        };

        let body = serde_json::to_vec(request)?;

        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| transport(format!("failed to spawn {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&body)
                .await
                .map_err(|e| transport(format!("failed to write request: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| transport(format!("failed to wait for {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(transport(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(self.parse_stdout(&stdout))
    }
}

/// Worker reached over HTTP; the request JSON is POSTed to `endpoint`
pub struct HttpWorker {
    id: WorkerId,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpWorker {
    pub fn new(id: WorkerId, endpoint: impl Into<String>) -> Self {
        Self {
            id,
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl Worker for HttpWorker {
    fn id(&self) -> WorkerId {
        self.id
    }

    async fn invoke(&self, request: &WorkerRequest) -> Result<WorkerResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| OrcaError::Transport {
                worker: self.id,
                message: format!("Failed to send request: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(OrcaError::Transport {
                worker: self.id,
                message: format!("HTTP {}: {}", status, error_text),
            });
        }

        response
            .json::<WorkerResponse>()
            .await
            .map_err(|e| OrcaError::MalformedResult {
                worker: self.id,
                reason: format!("Failed to parse response: {}", e),
            })
    }
}
