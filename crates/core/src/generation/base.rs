//! Base Backend trait and supporting types.

use ac_protocol::Role;
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A fully built, role-scoped generation request handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    /// The role the request is issued for.
    pub role: Role,

    /// Instruction, project context, earlier role outputs and task, joined.
    pub prompt: String,
}

impl BackendRequest {
    pub fn new(role: Role, prompt: impl Into<String>) -> Self {
        Self {
            role,
            prompt: prompt.into(),
        }
    }
}

/// Normalized result of one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOutput {
    pub text: String,

    /// Usage reported by the backend. `None` when the backend does not meter;
    /// the client estimates instead.
    pub tokens_used: Option<u64>,
}

impl BackendOutput {
    pub fn unmetered(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens_used: None,
        }
    }
}

/// Why a generation call failed. Each variant is a distinct failure reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("service not configured: {0}")]
    Configuration(String),
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("network error: {0}")]
    Network(String),
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("timed out after {attempts} poll attempts")]
    Timeout { attempts: u32 },
    #[error("backend reported failure: {0}")]
    Backend(String),
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
    #[error("generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Short machine-readable reason tag.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::EmptyPrompt => "empty_prompt",
            Self::Network(_) => "network",
            Self::Http { .. } => "http_status",
            Self::Timeout { .. } => "timeout",
            Self::Backend(_) => "backend",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Cancelled => "cancelled",
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timed out: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Name used in logs and in [`crate::generation::Generation::backend`].
    fn name(&self) -> &str;

    /// Fail fast when credentials or URLs are missing.
    fn ensure_configured(&self) -> Result<(), GenerationError>;

    async fn generate(
        &self,
        request: &BackendRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendOutput, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoBackend {
        configured: bool,
    }

    #[async_trait]
    impl Backend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        fn ensure_configured(&self) -> Result<(), GenerationError> {
            if self.configured {
                Ok(())
            } else {
                Err(GenerationError::Configuration("echo key missing".to_string()))
            }
        }

        async fn generate(
            &self,
            request: &BackendRequest,
            cancel: &CancellationToken,
        ) -> Result<BackendOutput, GenerationError> {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            Ok(BackendOutput::unmetered(format!(
                "{}: {}",
                request.role, request.prompt
            )))
        }
    }

    #[tokio::test]
    async fn test_backend_generate() {
        let backend = EchoBackend { configured: true };
        let request = BackendRequest::new(Role::Architect, "design it");
        let output = backend
            .generate(&request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.text, "architect: design it");
        assert!(output.tokens_used.is_none());
    }

    #[tokio::test]
    async fn test_backend_respects_cancellation() {
        let backend = EchoBackend { configured: true };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = backend
            .generate(&BackendRequest::new(Role::Backend, "x"), &cancel)
            .await;
        assert_eq!(result, Err(GenerationError::Cancelled));
    }

    #[test]
    fn test_backend_configuration_check() {
        let backend = EchoBackend { configured: false };
        assert!(matches!(
            backend.ensure_configured(),
            Err(GenerationError::Configuration(_))
        ));
    }

    #[test]
    fn test_error_reasons_are_distinct() {
        let errors = [
            GenerationError::Configuration(String::new()),
            GenerationError::EmptyPrompt,
            GenerationError::Network(String::new()),
            GenerationError::Http {
                status: 500,
                body: String::new(),
            },
            GenerationError::Timeout { attempts: 1 },
            GenerationError::Backend(String::new()),
            GenerationError::InvalidResponse(String::new()),
            GenerationError::Cancelled,
        ];
        let reasons: std::collections::HashSet<_> = errors.iter().map(|e| e.reason()).collect();
        assert_eq!(reasons.len(), errors.len());
    }

    #[test]
    fn test_timeout_message() {
        let err = GenerationError::Timeout { attempts: 120 };
        assert_eq!(err.to_string(), "timed out after 120 poll attempts");
    }
}
