//! Role-scoped generation over the configured backends.

use crate::generation::base::{Backend, BackendRequest, GenerationError};
use crate::generation::prompts::{build_prompt, PromptOverrides};
use crate::generation::router::{self, BackendChoice};
use crate::generation::tokens::estimate_combined;
use ac_protocol::{Role, RoutingSettings};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Normalized result of a successful [`GenerationClient::generate`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Name of the backend that served the call.
    pub backend: String,
    pub text: String,
    pub tokens_used: u64,
    /// `true` when `tokens_used` is the local `ceil(chars / 4)` estimate.
    pub estimated: bool,
}

/// One exchange kept in the client's conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub backend: BackendChoice,
    pub prompt: String,
    pub output: String,
}

/// Generation client holding up to two backends.
///
/// With both backends present every call is routed by [`router::route`];
/// with one present it serves every role. Successful turns are appended to
/// the history, which is never pruned.
pub struct GenerationClient {
    agent: Option<Arc<dyn Backend>>,
    coder: Option<Arc<dyn Backend>>,
    routing: RoutingSettings,
    overrides: PromptOverrides,
    history: Mutex<Vec<ConversationTurn>>,
}

impl Default for GenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationClient {
    /// A client with no backends. [`Self::ensure_configured`] fails until one
    /// is added.
    pub fn new() -> Self {
        Self {
            agent: None,
            coder: None,
            routing: RoutingSettings::default(),
            overrides: PromptOverrides::default(),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_agent(mut self, backend: Arc<dyn Backend>) -> Self {
        self.agent = Some(backend);
        self
    }

    pub fn with_coder(mut self, backend: Arc<dyn Backend>) -> Self {
        self.coder = Some(backend);
        self
    }

    pub fn with_routing(mut self, routing: RoutingSettings) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_overrides(mut self, overrides: PromptOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn overrides(&self) -> &PromptOverrides {
        &self.overrides
    }

    /// Fails when no backend is present or a present one lacks credentials.
    pub fn ensure_configured(&self) -> Result<(), GenerationError> {
        if self.agent.is_none() && self.coder.is_none() {
            return Err(GenerationError::Configuration(
                "no generation backend configured".to_string(),
            ));
        }
        for backend in self.agent.iter().chain(self.coder.iter()) {
            backend.ensure_configured()?;
        }
        Ok(())
    }

    /// The backend that will serve `role` for `prompt`.
    pub fn select_backend(
        &self,
        role: Role,
        prompt: &str,
    ) -> Result<(BackendChoice, Arc<dyn Backend>), GenerationError> {
        match (&self.agent, &self.coder) {
            (Some(agent), Some(coder)) => match router::route(role, prompt, &self.routing) {
                BackendChoice::Agent => Ok((BackendChoice::Agent, agent.clone())),
                BackendChoice::Coder => Ok((BackendChoice::Coder, coder.clone())),
            },
            (Some(agent), None) => Ok((BackendChoice::Agent, agent.clone())),
            (None, Some(coder)) => Ok((BackendChoice::Coder, coder.clone())),
            (None, None) => Err(GenerationError::Configuration(
                "no generation backend configured".to_string(),
            )),
        }
    }

    /// Perform one role-scoped generation call.
    ///
    /// `prompt` is the task for this role. `context` describes the project and
    /// `previous` carries earlier roles' outputs in execution order.
    pub async fn generate(
        &self,
        role: Role,
        prompt: &str,
        context: Option<&str>,
        previous: &[(Role, String)],
        cancel: &CancellationToken,
    ) -> Result<Generation, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        let (choice, backend) = self.select_backend(role, prompt)?;
        let full_prompt = build_prompt(
            self.overrides.instruction_for(role),
            prompt,
            context,
            previous,
        );

        debug!(
            role = %role,
            backend = backend.name(),
            choice = choice.as_str(),
            prompt_chars = full_prompt.len(),
            "generating"
        );

        let request = BackendRequest::new(role, full_prompt);
        let output = backend.generate(&request, cancel).await?;

        if output.text.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(
                "backend returned empty output".to_string(),
            ));
        }

        let (tokens_used, estimated) = match output.tokens_used {
            Some(tokens) => (tokens, false),
            None => (estimate_combined(&[&request.prompt, &output.text]), true),
        };

        debug!(role = %role, backend = backend.name(), tokens_used, estimated, "generation finished");

        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ConversationTurn {
                role,
                backend: choice,
                prompt: request.prompt,
                output: output.text.clone(),
            });

        Ok(Generation {
            backend: backend.name().to_string(),
            text: output.text,
            tokens_used,
            estimated,
        })
    }

    /// Copy of the conversation history, oldest first.
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::adapters::MockBackend;
    use crate::generation::tokens::estimate_tokens;

    fn routing() -> RoutingSettings {
        RoutingSettings {
            agent_keywords: vec!["architecture".to_string()],
            coder_keywords: vec!["code".to_string()],
            role_weight: 2,
        }
    }

    #[tokio::test]
    async fn test_no_backend_is_configuration_error() {
        let client = GenerationClient::new();
        assert!(matches!(
            client.ensure_configured(),
            Err(GenerationError::Configuration(_))
        ));

        let result = client
            .generate(Role::Architect, "design", None, &[], &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(GenerationError::Configuration(_))));
    }

    #[test]
    fn test_unconfigured_backend_fails_check() {
        let client = GenerationClient::new()
            .with_agent(Arc::new(MockBackend::success()))
            .with_coder(Arc::new(MockBackend::unconfigured().named("coder")));
        let err = client.ensure_configured().unwrap_err();
        assert!(err.to_string().contains("coder"));
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let client = GenerationClient::new().with_agent(Arc::new(MockBackend::success()));
        let result = client
            .generate(Role::Backend, "   ", None, &[], &CancellationToken::new())
            .await;
        assert_eq!(result, Err(GenerationError::EmptyPrompt));
        assert_eq!(client.history_len(), 0);
    }

    #[tokio::test]
    async fn test_tokens_estimated_over_prompt_and_output() {
        let client = GenerationClient::new().with_agent(Arc::new(MockBackend::with_response("abcdefgh")));
        let generation = client
            .generate(Role::Architect, "task", Some("ctx"), &[], &CancellationToken::new())
            .await
            .unwrap();

        let history = client.history();
        assert_eq!(history.len(), 1);
        let expected = estimate_tokens(&format!("{}{}", history[0].prompt, "abcdefgh"));
        assert_eq!(generation.tokens_used, expected);
        assert!(generation.estimated);
    }

    #[tokio::test]
    async fn test_reported_tokens_are_kept() {
        let client = GenerationClient::new()
            .with_agent(Arc::new(MockBackend::with_response("out").with_tokens(7)));
        let generation = client
            .generate(Role::Architect, "task", None, &[], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(generation.tokens_used, 7);
        assert!(!generation.estimated);
    }

    #[tokio::test]
    async fn test_routes_between_backends() {
        let client = GenerationClient::new()
            .with_agent(Arc::new(MockBackend::with_response("from agent").named("agent")))
            .with_coder(Arc::new(MockBackend::with_response("from coder").named("coder")))
            .with_routing(routing());
        let cancel = CancellationToken::new();

        let architect = client
            .generate(Role::Architect, "architecture please", None, &[], &cancel)
            .await
            .unwrap();
        assert_eq!(architect.backend, "agent");

        let backend = client
            .generate(Role::Backend, "write the code", None, &[], &cancel)
            .await
            .unwrap();
        assert_eq!(backend.backend, "coder");

        let history = client.history();
        assert_eq!(history[0].backend, BackendChoice::Agent);
        assert_eq!(history[1].backend, BackendChoice::Coder);
    }

    #[tokio::test]
    async fn test_single_backend_serves_every_role() {
        let client = GenerationClient::new()
            .with_coder(Arc::new(MockBackend::success().named("coder")))
            .with_routing(routing());
        let (choice, _) = client.select_backend(Role::Security, "architecture").unwrap();
        assert_eq!(choice, BackendChoice::Coder);
    }

    #[tokio::test]
    async fn test_override_replaces_instruction() {
        let mut overrides = PromptOverrides::new();
        overrides.insert(Role::Devops, "Only write a Dockerfile.");
        let client = GenerationClient::new()
            .with_agent(Arc::new(MockBackend::success()))
            .with_overrides(overrides);

        client
            .generate(Role::Devops, "deploy it", None, &[], &CancellationToken::new())
            .await
            .unwrap();
        assert!(client.history()[0].prompt.starts_with("Only write a Dockerfile."));
    }

    #[tokio::test]
    async fn test_empty_output_is_invalid_and_not_recorded() {
        let client = GenerationClient::new().with_agent(Arc::new(MockBackend::with_response("  ")));
        let result = client
            .generate(Role::Architect, "task", None, &[], &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
        assert_eq!(client.history_len(), 0);
    }

    #[tokio::test]
    async fn test_history_is_append_only() {
        let client = GenerationClient::new().with_agent(Arc::new(MockBackend::success()));
        let cancel = CancellationToken::new();
        for role in Role::ALL {
            client.generate(role, "task", None, &[], &cancel).await.unwrap();
        }
        let roles: Vec<_> = client.history().into_iter().map(|t| t.role).collect();
        assert_eq!(roles, Role::ALL.to_vec());
    }
}
