//! Keyword-scoring backend selection.
//!
//! When both backends are configured, each generation call is routed by a
//! deterministic heuristic: keyword hits in the task text per backend, plus
//! a fixed bonus for the backend the role naturally belongs to. Ties go to
//! the agent backend. The heuristic is advisory, not optimal.

use ac_protocol::{Role, RoutingSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendChoice {
    /// Trigger-and-poll agent backend.
    Agent,
    /// Single-call code model backend.
    Coder,
}

impl BackendChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Coder => "coder",
        }
    }
}

/// Scores computed for one routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteScore {
    pub agent: u32,
    pub coder: u32,
}

/// The backend a role leans towards before keywords are considered.
pub fn home_backend(role: Role) -> BackendChoice {
    match role {
        Role::Architect | Role::Devops | Role::Security => BackendChoice::Agent,
        Role::Backend | Role::Frontend => BackendChoice::Coder,
    }
}

pub fn score(role: Role, prompt: &str, settings: &RoutingSettings) -> RouteScore {
    let text = prompt.to_lowercase();
    let hits = |keywords: &[String]| -> u32 {
        keywords
            .iter()
            .filter(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
            .count() as u32
    };

    let mut score = RouteScore {
        agent: hits(&settings.agent_keywords),
        coder: hits(&settings.coder_keywords),
    };
    match home_backend(role) {
        BackendChoice::Agent => score.agent += settings.role_weight,
        BackendChoice::Coder => score.coder += settings.role_weight,
    }
    score
}

pub fn route(role: Role, prompt: &str, settings: &RoutingSettings) -> BackendChoice {
    let score = score(role, prompt, settings);
    if score.coder > score.agent {
        BackendChoice::Coder
    } else {
        BackendChoice::Agent
    }
}
