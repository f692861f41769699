//! Backends and job transports with per-role scripted behavior.

use ac_core::generation::adapters::{JobApi, JobHandle, PollResponse};
use ac_core::generation::{Backend, BackendOutput, BackendRequest, GenerationError};
use ac_protocol::Role;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Backend answering from a per-role script; unscripted roles reply
/// `"<role> output"` with 10 tokens. Every request is recorded.
#[derive(Default)]
pub struct ScriptedBackend {
    script: HashMap<Role, Result<BackendOutput, GenerationError>>,
    requests: Mutex<Vec<BackendRequest>>,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, role: Role, error: GenerationError) -> Self {
        self.script.insert(role, Err(error));
        self
    }

    pub fn reply(mut self, role: Role, text: &str, tokens: u64) -> Self {
        self.script.insert(
            role,
            Ok(BackendOutput {
                text: text.to_string(),
                tokens_used: Some(tokens),
            }),
        );
        self
    }

    pub fn requests(&self) -> Vec<BackendRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn prompt_for(&self, role: Role) -> Option<String> {
        self.requests()
            .into_iter()
            .find(|r| r.role == role)
            .map(|r| r.prompt)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn ensure_configured(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    async fn generate(
        &self,
        request: &BackendRequest,
        cancel: &CancellationToken,
    ) -> Result<BackendOutput, GenerationError> {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        self.requests.lock().unwrap().push(request.clone());
        match self.script.get(&request.role) {
            Some(result) => result.clone(),
            None => Ok(BackendOutput {
                text: format!("{} output", request.role),
                tokens_used: Some(10),
            }),
        }
    }
}

/// Job transport whose jobs succeed on the first poll, except for roles
/// marked stuck (always pending) or erroring (`chain-error`).
#[derive(Default)]
pub struct ScriptedJobApi {
    stuck: HashSet<Role>,
    erroring: HashSet<Role>,
    polls: AtomicU32,
    triggers: Mutex<Vec<Role>>,
}

#[allow(dead_code)]
impl ScriptedJobApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stuck_on(mut self, role: Role) -> Self {
        self.stuck.insert(role);
        self
    }

    pub fn erroring_on(mut self, role: Role) -> Self {
        self.erroring.insert(role);
        self
    }

    pub fn poll_count(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn triggered_roles(&self) -> Vec<Role> {
        self.triggers.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobApi for ScriptedJobApi {
    async fn trigger(&self, request: &BackendRequest) -> Result<JobHandle, GenerationError> {
        self.triggers.lock().unwrap().push(request.role);
        Ok(JobHandle {
            studio_id: "studio-1".to_string(),
            job_id: request.role.as_str().to_string(),
            conversation_id: None,
        })
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollResponse, GenerationError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let role = Role::ALL
            .into_iter()
            .find(|r| r.as_str() == handle.job_id)
            .ok_or_else(|| GenerationError::InvalidResponse("unknown job".to_string()))?;

        if self.stuck.contains(&role) {
            Ok(PollResponse::pending())
        } else if self.erroring.contains(&role) {
            Ok(PollResponse::error(json!("agent crashed")))
        } else {
            Ok(PollResponse::success(json!({ "answer": format!("{role} via job") })))
        }
    }
}
