//! Single-call inference backend.
//!
//! One `POST {inputs, parameters}` returns the whole completion, so there is
//! no job handle and no polling. Usage is not reported by this endpoint.

use crate::generation::base::{Backend, BackendOutput, BackendRequest, GenerationError};
use ac_protocol::CoderBackendSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Inference calls can run long on cold models.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct InferenceBody<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InferenceParameters {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub return_full_text: bool,
}

impl From<&CoderBackendSettings> for InferenceParameters {
    fn from(settings: &CoderBackendSettings) -> Self {
        Self {
            max_new_tokens: settings.max_new_tokens,
            temperature: settings.temperature,
            return_full_text: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
    Failure { error: String },
}

/// Parse an inference response body into the generated text.
///
/// Accepts `[{"generated_text": ...}]` and a bare `{"generated_text": ...}`.
/// An `{"error": ...}` body is a backend failure.
pub fn parse_inference_response(body: &str) -> Result<String, GenerationError> {
    let response: InferenceResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::InvalidResponse(format!("{e}: {body}")))?;

    let text = match response {
        InferenceResponse::Batch(items) => items
            .into_iter()
            .next()
            .map(|item| item.generated_text)
            .ok_or_else(|| GenerationError::InvalidResponse("empty result array".to_string()))?,
        InferenceResponse::Single(item) => item.generated_text,
        InferenceResponse::Failure { error } => return Err(GenerationError::Backend(error)),
    };

    Ok(text)
}

/// [`Backend`] over a hosted text-generation endpoint.
pub struct InferenceBackend {
    name: String,
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_key_env: String,
    parameters: InferenceParameters,
}

impl InferenceBackend {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_key_env: impl Into<String>,
        parameters: InferenceParameters,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_key_env: api_key_env.into(),
            parameters,
        })
    }

    pub fn parameters(&self) -> InferenceParameters {
        self.parameters
    }

    async fn call(&self, request: &BackendRequest) -> Result<String, GenerationError> {
        let body = InferenceBody {
            inputs: &request.prompt,
            parameters: self.parameters,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::from_transport)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(GenerationError::from_transport)?;

        if !status.is_success() {
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_inference_response(&text)
    }
}

#[async_trait]
impl Backend for InferenceBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_configured(&self) -> Result<(), GenerationError> {
        if self.endpoint.is_empty() {
            return Err(GenerationError::Configuration(
                "[coder] endpoint is empty".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(GenerationError::Configuration(format!(
                "coder API key not found in environment variable '{}'",
                self.api_key_env
            )));
        }
        Ok(())
    }

    async fn generate(
        &self,
        request: &BackendRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendOutput, GenerationError> {
        debug!(
            backend = %self.name,
            role = %request.role,
            max_new_tokens = self.parameters.max_new_tokens,
            "sending inference request"
        );

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            text = self.call(request) => text?,
        };

        Ok(BackendOutput::unmetered(text))
    }
}
