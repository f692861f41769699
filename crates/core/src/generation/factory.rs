//! Build a [`GenerationClient`] from loaded configuration.

use crate::config::AppConfig;
use crate::generation::adapters::{
    HttpJobApi, InferenceBackend, InferenceParameters, JobBackend, MockBackend, PollPolicy,
};
use crate::generation::base::GenerationError;
use crate::generation::client::GenerationClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Read an API key from `var`. Missing or blank keys become an empty string
/// so the backend reports them from `ensure_configured`.
fn read_api_key(var: &str) -> String {
    std::env::var(var)
        .map(|key| key.trim().to_string())
        .unwrap_or_default()
}

/// Construct the client described by `config`.
///
/// Credentials come from the environment variables the backend tables name.
/// Missing credentials do not fail here; the engine checks configuration
/// before any step is created.
pub fn build_client(config: &AppConfig) -> Result<GenerationClient, GenerationError> {
    let service = &config.service;
    let mut client = GenerationClient::new()
        .with_routing(service.routing.clone())
        .with_overrides(config.prompt_overrides.clone());

    if let Some(agent) = &service.agent {
        let api = HttpJobApi::new(
            agent.base_url.clone(),
            agent.agent_id.clone(),
            read_api_key(&agent.api_key_env),
            agent.api_key_env.clone(),
        )?;
        let backend = JobBackend::new("agent", Arc::new(api), PollPolicy::from(agent));
        debug!(base_url = %agent.base_url, policy = ?backend.policy(), "agent backend configured");
        client = client.with_agent(Arc::new(backend));
    }

    if let Some(coder) = &service.coder {
        let backend = InferenceBackend::new(
            "coder",
            coder.endpoint.clone(),
            read_api_key(&coder.api_key_env),
            coder.api_key_env.clone(),
            InferenceParameters::from(coder),
        )?;
        debug!(endpoint = %coder.endpoint, "coder backend configured");
        client = client.with_coder(Arc::new(backend));
    }

    Ok(client)
}

/// A client served by [`MockBackend`]s, for running without network access.
///
/// Each call waits `delay` so progress is observable.
pub fn build_offline_client(config: &AppConfig, delay: Duration) -> GenerationClient {
    GenerationClient::new()
        .with_routing(config.service.routing.clone())
        .with_overrides(config.prompt_overrides.clone())
        .with_agent(Arc::new(MockBackend::delayed(delay).named("offline-agent")))
        .with_coder(Arc::new(MockBackend::delayed(delay).named("offline-coder")))
}
