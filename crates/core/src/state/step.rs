//! Step state machine.
//!
//! A step moves `pending -> in_progress -> {completed | failed}`. Terminal
//! states are final. Every transition goes through [`apply_update`], which
//! validates the merged result before writing it back, so a rejected update
//! leaves the step untouched.

use ac_protocol::{GenerationStep, StepStatus, StepUpdate};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("step is already {0:?} and cannot change")]
    Terminal(StepStatus),
    #[error("illegal transition from {from:?} to {to:?}")]
    Illegal { from: StepStatus, to: StepStatus },
    #[error("a {status:?} step requires {field}")]
    MissingField {
        status: StepStatus,
        field: &'static str,
    },
    #[error("{field} cannot be set on a {status:?} step")]
    FieldNotAllowed {
        status: StepStatus,
        field: &'static str,
    },
}

/// Whether `from -> to` is an edge of the step state machine.
pub fn can_transition(from: StepStatus, to: StepStatus) -> bool {
    matches!(
        (from, to),
        (StepStatus::Pending, StepStatus::InProgress)
            | (StepStatus::InProgress, StepStatus::Completed)
            | (StepStatus::InProgress, StepStatus::Failed)
    )
}

/// Merge `update` into `step`.
///
/// An update without a status merges fields into a non-terminal step. The
/// result must keep `started_at` set exactly when the step has started and
/// `completed_at` and `tokens_used` set exactly when it is terminal.
pub fn apply_update(step: &mut GenerationStep, update: &StepUpdate) -> Result<(), TransitionError> {
    if step.status.is_terminal() {
        return Err(TransitionError::Terminal(step.status));
    }

    let mut next = step.clone();
    if let Some(to) = update.status {
        if to != step.status && !can_transition(step.status, to) {
            return Err(TransitionError::Illegal {
                from: step.status,
                to,
            });
        }
        next.status = to;
    }
    if let Some(output) = &update.output {
        next.output = Some(output.clone());
    }
    if let Some(tokens) = update.tokens_used {
        next.tokens_used = Some(tokens);
    }
    if let Some(at) = update.started_at {
        next.started_at = Some(at);
    }
    if let Some(at) = update.completed_at {
        next.completed_at = Some(at);
    }

    validate(&next)?;
    *step = next;
    Ok(())
}

fn validate(step: &GenerationStep) -> Result<(), TransitionError> {
    let status = step.status;
    let started = status != StepStatus::Pending;
    let terminal = status.is_terminal();

    match (started, step.started_at.is_some()) {
        (true, false) => {
            return Err(TransitionError::MissingField {
                status,
                field: "started_at",
            })
        }
        (false, true) => {
            return Err(TransitionError::FieldNotAllowed {
                status,
                field: "started_at",
            })
        }
        _ => {}
    }

    match (terminal, step.completed_at.is_some()) {
        (true, false) => {
            return Err(TransitionError::MissingField {
                status,
                field: "completed_at",
            })
        }
        (false, true) => {
            return Err(TransitionError::FieldNotAllowed {
                status,
                field: "completed_at",
            })
        }
        _ => {}
    }

    if terminal && step.tokens_used.is_none() {
        return Err(TransitionError::MissingField {
            status,
            field: "tokens_used",
        });
    }
    if !terminal && step.tokens_used.is_some() {
        return Err(TransitionError::FieldNotAllowed {
            status,
            field: "tokens_used",
        });
    }

    if terminal && step.output.as_deref().map_or(true, |o| o.trim().is_empty()) {
        return Err(TransitionError::MissingField {
            status,
            field: "output",
        });
    }
    if status == StepStatus::Failed && step.tokens_used != Some(0) {
        return Err(TransitionError::FieldNotAllowed {
            status,
            field: "non-zero tokens_used",
        });
    }

    Ok(())
}

/// Transition the step to InProgress at `at`.
pub fn start_step(step: &mut GenerationStep, at: i64) -> Result<(), TransitionError> {
    apply_update(step, &StepUpdate::started(at))
}

/// Transition the step to Completed with its output and token count.
pub fn complete_step(
    step: &mut GenerationStep,
    output: impl Into<String>,
    tokens_used: u64,
    at: i64,
) -> Result<(), TransitionError> {
    apply_update(step, &StepUpdate::completed(output, tokens_used, at))
}

/// Transition the step to Failed, recording `error` as its output.
pub fn fail_step(
    step: &mut GenerationStep,
    error: impl AsRef<str>,
    at: i64,
) -> Result<(), TransitionError> {
    apply_update(step, &StepUpdate::failed(error, at))
}
