//! Service configuration models for `.autocrea/config.toml`.
//!
//! Every table is optional. Credentials never live in the file: each backend
//! table names the environment variable that holds its API key.
//!
//! # Example
//!
//! ```toml
//! [generation]
//! estimate_multiplier = 10
//!
//! [agent]
//! base_url = "https://api.example.com/latest"
//! agent_id = "3f1c..."
//! api_key_env = "AUTOCREA_AGENT_API_KEY"
//!
//! [coder]
//! endpoint = "https://inference.example.com/models/joxcoder"
//!
//! [routing]
//! role_weight = 2
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Root of `config.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, TS)]
pub struct ServiceConfig {
    #[serde(default)]
    pub generation: GenerationSettings,

    /// Trigger-and-poll agent backend.
    #[serde(default)]
    pub agent: Option<AgentBackendSettings>,

    /// Single-call code model backend.
    #[serde(default)]
    pub coder: Option<CoderBackendSettings>,

    #[serde(default)]
    pub routing: RoutingSettings,
}

/// Run-level settings.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct GenerationSettings {
    /// Multiplier applied to the description's token estimate to produce
    /// the advisory run estimate.
    #[serde(default = "default_estimate_multiplier")]
    #[ts(type = "number")]
    pub estimate_multiplier: u64,

    /// Directory receiving one JSON file per finished run.
    #[serde(default)]
    pub history_dir: Option<String>,

    /// Per-owner token allowance enforced before a run starts.
    /// Unlimited when absent.
    #[serde(default)]
    #[ts(type = "number | null")]
    pub token_allowance: Option<u64>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            estimate_multiplier: default_estimate_multiplier(),
            history_dir: None,
            token_allowance: None,
        }
    }
}

/// Settings for the trigger-and-poll agent backend.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct AgentBackendSettings {
    /// API root, e.g. `https://api.example.com/latest`.
    pub base_url: String,

    /// Agent the trigger call is addressed to.
    pub agent_id: String,

    #[serde(default = "default_agent_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_poll_interval_ms")]
    #[ts(type = "number")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

/// Settings for the single-call inference backend.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct CoderBackendSettings {
    /// Full URL of the model inference endpoint.
    pub endpoint: String,

    #[serde(default = "default_coder_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Keyword lists and weights for choosing between the two backends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct RoutingSettings {
    #[serde(default = "default_agent_keywords")]
    pub agent_keywords: Vec<String>,

    #[serde(default = "default_coder_keywords")]
    pub coder_keywords: Vec<String>,

    /// Score added to the backend a role naturally belongs to.
    #[serde(default = "default_role_weight")]
    pub role_weight: u32,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            agent_keywords: default_agent_keywords(),
            coder_keywords: default_coder_keywords(),
            role_weight: default_role_weight(),
        }
    }
}

fn default_estimate_multiplier() -> u64 {
    10
}

fn default_agent_key_env() -> String {
    "AUTOCREA_AGENT_API_KEY".to_string()
}

fn default_coder_key_env() -> String {
    "AUTOCREA_CODER_API_KEY".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_attempts() -> u32 {
    120
}

fn default_max_new_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.2
}

fn default_role_weight() -> u32 {
    2
}

fn default_agent_keywords() -> Vec<String> {
    [
        "architecture",
        "design",
        "plan",
        "strategy",
        "requirements",
        "infrastructure",
        "deploy",
        "security",
        "review",
        "scalab",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_coder_keywords() -> Vec<String> {
    [
        "implement",
        "code",
        "function",
        "component",
        "endpoint",
        "api",
        "class",
        "refactor",
        "test",
        "bug",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
