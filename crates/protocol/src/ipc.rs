//! Events pushed from the run store to its observers.
//!
//! Every mutation of a run store produces one `RunEvent`. Observers (the CLI,
//! a web socket bridge) subscribe instead of polling the store.
//!
//! Uses tagged enum serialization for TypeScript compatibility:
//! ```json
//! {
//!   "type": "stepUpdated",
//!   "payload": {
//!     "run_id": "uuid-here",
//!     "step_id": "uuid-here",
//!     "role": "backend",
//!     "status": "in_progress"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::role_models::Role;
use crate::run_models::StepStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum RunEvent {
    /// A new run replaced whatever the store held before.
    RunStarted {
        #[ts(type = "string")]
        run_id: Uuid,
        project_name: String,
        #[ts(type = "number")]
        estimated_tokens: u64,
    },

    /// A pending step was appended at the end of the run.
    StepAppended {
        #[ts(type = "string")]
        run_id: Uuid,
        #[ts(type = "string")]
        step_id: Uuid,
        role: Role,
    },

    /// A step's fields were merged; `status` is the status after the merge.
    StepUpdated {
        #[ts(type = "string")]
        run_id: Uuid,
        #[ts(type = "string")]
        step_id: Uuid,
        role: Role,
        status: StepStatus,
    },

    /// The run reached its terminal state and its artifact is available.
    RunFinished {
        #[ts(type = "string")]
        run_id: Uuid,
        #[ts(type = "number")]
        total_tokens_used: u64,
    },

    /// The store was cleared back to the empty run.
    RunReset,
}

impl RunEvent {
    /// The run this event belongs to, if any.
    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::StepAppended { run_id, .. }
            | Self::StepUpdated { run_id, .. }
            | Self::RunFinished { run_id, .. } => Some(*run_id),
            Self::RunReset => None,
        }
    }
}
