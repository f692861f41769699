//! Trigger-and-poll backend.
//!
//! The agent service is job based: a trigger call returns a job handle and the
//! result becomes available later through a poll endpoint. The HTTP surface is
//! isolated behind [`JobApi`] so the polling loop can be driven by a scripted
//! transport in tests.
//!
//! ```text
//! POST {base_url}/agents/trigger          -> { "studio_id", "job_id" }
//! GET  {base_url}/studios/{studio_id}/async_poll/{job_id}
//!                                         -> { "type": "chain-success" | "chain-error" | ..., "output" }
//! ```

use crate::generation::base::{Backend, BackendOutput, BackendRequest, GenerationError};
use ac_protocol::AgentBackendSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-request HTTP timeout for trigger and poll calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle returned by the trigger call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobHandle {
    pub studio_id: String,
    pub job_id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Raw body of one poll call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PollResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub output: Option<Value>,
}

impl PollResponse {
    pub fn pending() -> Self {
        Self {
            kind: "chain-running".to_string(),
            output: None,
        }
    }

    pub fn success(output: Value) -> Self {
        Self {
            kind: "chain-success".to_string(),
            output: Some(output),
        }
    }

    pub fn error(output: Value) -> Self {
        Self {
            kind: "chain-error".to_string(),
            output: Some(output),
        }
    }

    pub fn status(&self) -> Result<PollStatus, GenerationError> {
        match self.kind.as_str() {
            "chain-success" => {
                let text = self
                    .output
                    .as_ref()
                    .map(extract_text)
                    .filter(|t| !t.trim().is_empty())
                    .ok_or_else(|| {
                        GenerationError::InvalidResponse(
                            "chain-success without output".to_string(),
                        )
                    })?;
                Ok(PollStatus::Success(text))
            }
            "chain-error" => Ok(PollStatus::Failure(
                self.output
                    .as_ref()
                    .map(extract_text)
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| "unknown error".to_string()),
            )),
            _ => Ok(PollStatus::Pending),
        }
    }
}

/// Interpretation of a poll response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Pending,
    Success(String),
    Failure(String),
}

/// Pull the generated text out of a job output value.
///
/// Strings are used verbatim; objects yield their first string-valued
/// `answer`, `output`, `text` or `content` field; anything else is rendered
/// as JSON.
pub fn extract_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Object(map) => ["answer", "output", "text", "content"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

/// Transport for the job API.
#[async_trait]
pub trait JobApi: Send + Sync {
    fn ensure_configured(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    async fn trigger(&self, request: &BackendRequest) -> Result<JobHandle, GenerationError>;

    async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, GenerationError>;
}

#[derive(Debug, Serialize)]
struct TriggerBody<'a> {
    agent_id: &'a str,
    message: TriggerMessage<'a>,
}

#[derive(Debug, Serialize)]
struct TriggerMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// reqwest-backed [`JobApi`].
pub struct HttpJobApi {
    client: reqwest::Client,
    base_url: String,
    agent_id: String,
    api_key: String,
    api_key_env: String,
}

impl HttpJobApi {
    /// Build the transport. Empty fields are accepted here and reported by
    /// [`JobApi::ensure_configured`] before any run starts.
    pub fn new(
        base_url: impl Into<String>,
        agent_id: impl Into<String>,
        api_key: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent_id: agent_id.into(),
            api_key: api_key.into(),
            api_key_env: api_key_env.into(),
        })
    }

    fn trigger_url(&self) -> String {
        format!("{}/agents/trigger", self.base_url)
    }

    fn poll_url(&self, handle: &JobHandle) -> String {
        format!(
            "{}/studios/{}/async_poll/{}",
            self.base_url, handle.studio_id, handle.job_id
        )
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Http {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl JobApi for HttpJobApi {
    fn ensure_configured(&self) -> Result<(), GenerationError> {
        if self.base_url.is_empty() {
            return Err(GenerationError::Configuration(
                "[agent] base_url is empty".to_string(),
            ));
        }
        if self.agent_id.is_empty() {
            return Err(GenerationError::Configuration(
                "[agent] agent_id is empty".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(GenerationError::Configuration(format!(
                "agent API key not found in environment variable '{}'",
                self.api_key_env
            )));
        }
        Ok(())
    }

    async fn trigger(&self, request: &BackendRequest) -> Result<JobHandle, GenerationError> {
        let body = TriggerBody {
            agent_id: &self.agent_id,
            message: TriggerMessage {
                role: "user",
                content: &request.prompt,
            },
        };

        let response = self
            .client
            .post(self.trigger_url())
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::from_transport)?;

        read_json(response).await
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, GenerationError> {
        let response = self
            .client
            .get(self.poll_url(handle))
            .header("Authorization", &self.api_key)
            .send()
            .await
            .map_err(GenerationError::from_transport)?;

        read_json(response).await
    }
}

/// Wait interval and attempt ceiling of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 120,
        }
    }
}

impl From<&AgentBackendSettings> for PollPolicy {
    fn from(settings: &AgentBackendSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.poll_interval_ms),
            max_attempts: settings.max_poll_attempts,
        }
    }
}

/// [`Backend`] over a [`JobApi`].
pub struct JobBackend {
    name: String,
    api: Arc<dyn JobApi>,
    policy: PollPolicy,
}

impl JobBackend {
    pub fn new(name: impl Into<String>, api: Arc<dyn JobApi>, policy: PollPolicy) -> Self {
        Self {
            name: name.into(),
            api,
            policy,
        }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    async fn poll_until_done(
        &self,
        handle: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        for attempt in 1..=self.policy.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                _ = tokio::time::sleep(self.policy.interval) => {}
            }

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                response = self.api.poll(handle) => response?,
            };

            match response.status()? {
                PollStatus::Success(text) => {
                    debug!(backend = %self.name, job_id = %handle.job_id, attempt, "job succeeded");
                    return Ok(text);
                }
                PollStatus::Failure(reason) => return Err(GenerationError::Backend(reason)),
                PollStatus::Pending => {
                    debug!(backend = %self.name, job_id = %handle.job_id, attempt, kind = %response.kind, "job pending");
                }
            }
        }

        Err(GenerationError::Timeout {
            attempts: self.policy.max_attempts,
        })
    }
}

#[async_trait]
impl Backend for JobBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_configured(&self) -> Result<(), GenerationError> {
        self.api.ensure_configured()
    }

    async fn generate(
        &self,
        request: &BackendRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendOutput, GenerationError> {
        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            handle = self.api.trigger(request) => handle?,
        };
        debug!(
            backend = %self.name,
            role = %request.role,
            studio_id = %handle.studio_id,
            job_id = %handle.job_id,
            "job triggered"
        );

        let text = self.poll_until_done(&handle, cancel).await?;
        Ok(BackendOutput::unmetered(text))
    }
}
