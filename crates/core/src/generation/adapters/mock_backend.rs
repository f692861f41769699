//! Mock backend implementation for testing and offline runs.

use crate::generation::base::{Backend, BackendOutput, BackendRequest, GenerationError};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
enum Reply {
    Echo,
    Fixed(String),
    Fail(GenerationError),
}

#[derive(Debug, Clone)]
pub struct MockBackend {
    name: String,
    configured: bool,
    reply: Reply,
    tokens_used: Option<u64>,
    delay: Option<Duration>,
}

impl MockBackend {
    /// Replies with a deterministic summary of the request.
    pub fn success() -> Self {
        Self {
            name: "mock".to_string(),
            configured: true,
            reply: Reply::Echo,
            tokens_used: None,
            delay: None,
        }
    }

    pub fn with_response(text: impl Into<String>) -> Self {
        Self {
            reply: Reply::Fixed(text.into()),
            ..Self::success()
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            reply: Reply::Fail(error),
            ..Self::success()
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::success()
        }
    }

    /// Wait `delay` (cancellable) before replying.
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::success()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Report backend-metered usage instead of leaving it to estimation.
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_configured(&self) -> Result<(), GenerationError> {
        if self.configured {
            Ok(())
        } else {
            Err(GenerationError::Configuration(format!(
                "{} backend has no credentials",
                self.name
            )))
        }
    }

    async fn generate(
        &self,
        request: &BackendRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendOutput, GenerationError> {
        if let Some(delay) = self.delay {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        } else if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let text = match &self.reply {
            Reply::Echo => format!(
                "[{}] generated {} output for a {}-character prompt",
                self.name,
                request.role,
                request.prompt.chars().count()
            ),
            Reply::Fixed(text) => text.clone(),
            Reply::Fail(error) => return Err(error.clone()),
        };

        Ok(BackendOutput {
            text,
            tokens_used: self.tokens_used,
        })
    }
}
