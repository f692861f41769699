//! Generation roles.
//!
//! A run is split into one step per role. The order of [`Role::ALL`] is the
//! execution order: later roles see the outputs of earlier ones.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// A generation persona responsible for one step of a run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Designs the overall system structure.
    Architect,
    /// Implements server-side code.
    Backend,
    /// Implements the user interface.
    Frontend,
    /// Produces build, deployment and infrastructure configuration.
    Devops,
    /// Reviews everything above for vulnerabilities.
    Security,
}

impl Role {
    /// All roles in execution order.
    pub const ALL: [Role; 5] = [
        Role::Architect,
        Role::Backend,
        Role::Frontend,
        Role::Devops,
        Role::Security,
    ];

    /// Lowercase identifier, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::Devops => "devops",
            Self::Security => "security",
        }
    }

    /// Human-readable description used as the step name.
    pub fn title(self) -> &'static str {
        match self {
            Self::Architect => "System Architecture Design",
            Self::Backend => "Backend Implementation",
            Self::Frontend => "Frontend Implementation",
            Self::Devops => "DevOps Configuration",
            Self::Security => "Security Review",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
