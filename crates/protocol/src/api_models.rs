//! Request and response payloads of the generation endpoint.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::run_models::{GenerationRun, GenerationStep};

/// Body accepted by the generation endpoint.
///
/// ```json
/// { "projectName": "todo-app", "projectDescription": "A todo list with auth" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub project_description: String,
}

/// Synchronous final payload returned once a run has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[ts(type = "string")]
    pub run_id: Uuid,
    pub steps: Vec<GenerationStep>,
    #[ts(type = "number")]
    pub total_tokens: u64,
    pub generated_code: String,
}

impl From<&GenerationRun> for GenerateResponse {
    fn from(run: &GenerationRun) -> Self {
        Self {
            run_id: run.id,
            steps: run.steps.clone(),
            total_tokens: run.total_tokens_used,
            generated_code: run.generated_code.clone().unwrap_or_default(),
        }
    }
}

/// One line of the persisted run history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    #[ts(type = "string")]
    pub run_id: Uuid,
    pub owner: String,
    pub project_name: String,
    #[ts(type = "number")]
    pub total_tokens_used: u64,
    pub failed_steps: usize,
    /// Epoch milliseconds at which the run was stored.
    #[ts(type = "number")]
    pub saved_at: i64,
}
