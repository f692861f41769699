//! Runtime generation state models.
//!
//! This module defines the structures tracking a single generation run and
//! its per-role steps. Timestamps are epoch milliseconds.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::role_models::Role;

/// Lifecycle status of a single generation step.
///
/// The only legal progression is:
/// Pending -> InProgress -> (Completed | Failed)
///
/// Completed and Failed are terminal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step has been appended but not started.
    Pending,

    /// The generation call for this step is in flight.
    InProgress,

    /// The backend returned output for this step.
    Completed,

    /// The generation call failed; `output` holds the error text.
    Failed,
}

impl StepStatus {
    /// Whether no further transition is allowed from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One unit of work for a single role within a run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStep {
    /// Unique identifier, assigned at creation.
    #[ts(type = "string")]
    pub id: Uuid,

    /// The role this step runs as.
    pub role: Role,

    /// Human-readable description of the step's purpose.
    pub name: String,

    /// Current lifecycle status.
    pub status: StepStatus,

    /// Generated text on completion, error text on failure.
    #[serde(default)]
    pub output: Option<String>,

    /// Tokens attributed to this step. Zero for failed steps.
    #[serde(default)]
    #[ts(type = "number | null")]
    pub tokens_used: Option<u64>,

    /// Set on the transition to InProgress.
    #[serde(default)]
    #[ts(type = "number | null")]
    pub started_at: Option<i64>,

    /// Set on the transition to Completed or Failed.
    #[serde(default)]
    #[ts(type = "number | null")]
    pub completed_at: Option<i64>,
}

impl GenerationStep {
    /// Create a pending step for `role` with a fresh id.
    pub fn pending(role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            name: role.title().to_string(),
            status: StepStatus::Pending,
            output: None,
            tokens_used: None,
            started_at: None,
            completed_at: None,
        }
    }
}

/// A partial update merged into a step by id.
///
/// Every `Some` field overwrites the corresponding step field; `None`
/// fields are left untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdate {
    #[serde(default)]
    pub status: Option<StepStatus>,

    #[serde(default)]
    pub output: Option<String>,

    #[serde(default)]
    #[ts(type = "number | null")]
    pub tokens_used: Option<u64>,

    #[serde(default)]
    #[ts(type = "number | null")]
    pub started_at: Option<i64>,

    #[serde(default)]
    #[ts(type = "number | null")]
    pub completed_at: Option<i64>,
}

impl StepUpdate {
    /// Transition to InProgress at `at`.
    pub fn started(at: i64) -> Self {
        Self {
            status: Some(StepStatus::InProgress),
            started_at: Some(at),
            ..Self::default()
        }
    }

    /// Transition to Completed with the generated output.
    pub fn completed(output: impl Into<String>, tokens_used: u64, at: i64) -> Self {
        Self {
            status: Some(StepStatus::Completed),
            output: Some(output.into()),
            tokens_used: Some(tokens_used),
            completed_at: Some(at),
            ..Self::default()
        }
    }

    /// Transition to Failed; the error is recorded as `Error: <reason>`.
    pub fn failed(error: impl AsRef<str>, at: i64) -> Self {
        Self {
            status: Some(StepStatus::Failed),
            output: Some(format!("Error: {}", error.as_ref())),
            tokens_used: Some(0),
            completed_at: Some(at),
            ..Self::default()
        }
    }
}

/// An ordered sequence of steps plus run-level aggregates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRun {
    /// Run identifier. Nil for the empty (reset) run.
    #[ts(type = "string")]
    pub id: Uuid,

    pub project_name: String,

    pub project_description: String,

    /// Steps in execution order.
    pub steps: Vec<GenerationStep>,

    /// Sum of all steps' `tokens_used`.
    #[ts(type = "number")]
    pub total_tokens_used: u64,

    /// Pre-run advisory estimate derived from the description length.
    #[ts(type = "number")]
    pub estimated_tokens: u64,

    /// Final artifact, present once the run is finished.
    #[serde(default)]
    pub generated_code: Option<String>,

    /// True from run start until every step is terminal.
    pub is_generating: bool,
}

impl GenerationRun {
    /// The empty run every store starts from and resets to.
    pub fn empty() -> Self {
        Self {
            id: Uuid::nil(),
            project_name: String::new(),
            project_description: String::new(),
            steps: Vec::new(),
            total_tokens_used: 0,
            estimated_tokens: 0,
            generated_code: None,
            is_generating: false,
        }
    }

    /// Start a new generating run with a fresh id.
    pub fn new(
        project_name: impl Into<String>,
        project_description: impl Into<String>,
        estimated_tokens: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_name: project_name.into(),
            project_description: project_description.into(),
            estimated_tokens,
            is_generating: true,
            ..Self::empty()
        }
    }

    /// Look up a step by id.
    pub fn step(&self, id: Uuid) -> Option<&GenerationStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Look up a step by id for mutation.
    pub fn step_mut(&mut self, id: Uuid) -> Option<&mut GenerationStep> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Recompute the token total from the steps.
    pub fn step_token_sum(&self) -> u64 {
        self.steps.iter().filter_map(|s| s.tokens_used).sum()
    }

    /// Outputs of completed steps, in execution order.
    pub fn completed_outputs(&self) -> Vec<(Role, String)> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .filter_map(|s| s.output.clone().map(|o| (s.role, o)))
            .collect()
    }

    /// Number of steps that ended in Failed.
    pub fn failed_step_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }
}

impl Default for GenerationRun {
    fn default() -> Self {
        Self::empty()
    }
}
