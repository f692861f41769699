//! Assertion helpers over finished runs and run events.

use ac_protocol::{GenerationRun, Role, RunEvent, StepStatus};
use std::collections::HashMap;
use uuid::Uuid;

/// One step per role, in the fixed role order.
pub fn assert_roles_in_order(run: &GenerationRun) {
    let roles: Vec<Role> = run.steps.iter().map(|s| s.role).collect();
    assert_eq!(roles, Role::ALL.to_vec(), "steps must follow the role order");
}

/// Field invariants of every terminal step and of the run totals.
pub fn assert_finished_run_invariants(run: &GenerationRun) {
    assert!(!run.is_generating, "finished run must not be generating");
    assert!(run.generated_code.is_some(), "finished run must carry code");

    for step in &run.steps {
        assert!(step.started_at.is_some(), "{} has no started_at", step.role);
        assert!(step.completed_at.is_some(), "{} has no completed_at", step.role);
        assert!(step.completed_at >= step.started_at);

        match step.status {
            StepStatus::Completed => {
                assert!(
                    step.output.as_deref().is_some_and(|o| !o.is_empty()),
                    "{} completed without output",
                    step.role
                );
                assert!(step.tokens_used.is_some());
            }
            StepStatus::Failed => {
                assert!(
                    step.output.as_deref().is_some_and(|o| o.starts_with("Error:")),
                    "{} failed without an error marker",
                    step.role
                );
                assert_eq!(step.tokens_used, Some(0));
            }
            other => panic!("{} is not terminal: {:?}", step.role, other),
        }
    }

    assert_eq!(run.total_tokens_used, run.step_token_sum());
}

/// Step `i + 1` never enters InProgress before step `i` is terminal.
pub fn assert_sequential_steps(events: &[RunEvent]) {
    let mut order: Vec<Uuid> = Vec::new();
    let mut status: HashMap<Uuid, StepStatus> = HashMap::new();

    for event in events {
        match event {
            RunEvent::StepAppended { step_id, .. } => {
                if let Some(prev) = order.last() {
                    assert!(
                        status[prev].is_terminal(),
                        "step appended while previous step was {:?}",
                        status[prev]
                    );
                }
                order.push(*step_id);
                status.insert(*step_id, StepStatus::Pending);
            }
            RunEvent::StepUpdated {
                step_id,
                status: new_status,
                ..
            } => {
                let index = order
                    .iter()
                    .position(|id| id == step_id)
                    .expect("update for a step that was never appended");
                if *new_status == StepStatus::InProgress && index > 0 {
                    assert!(
                        status[&order[index - 1]].is_terminal(),
                        "step {} started before step {} finished",
                        index,
                        index - 1
                    );
                }
                status.insert(*step_id, *new_status);
            }
            _ => {}
        }
    }
}
