//! Observable run store.
//!
//! The engine writes progress into a [`RunStore`] handed to it by reference.
//! [`InMemoryRunStore`] keeps the current run in a `watch` channel, so readers
//! always see a complete snapshot, and pushes one [`RunEvent`] per mutation
//! to live subscribers over a `broadcast` channel.
//!
//! Every write names the run it belongs to. Writes addressed to a run that is
//! no longer current (superseded or reset) are dropped, which keeps a
//! cancelled run from leaking into its successor.

use crate::state::step::apply_update;
use ac_protocol::{GenerationRun, GenerationStep, RunEvent, StepUpdate};
use std::pin::Pin;
use tokio::sync::{broadcast, watch};
use tokio_stream::Stream;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Injectable state holder written by the engine.
///
/// Mutators return `true` when the write was applied.
pub trait RunStore: Send + Sync {
    /// Replace the current run with `run`.
    fn start_run(&self, run: &GenerationRun);

    /// Append a pending step at the end of run `run_id`.
    fn append_step(&self, run_id: Uuid, step: GenerationStep) -> bool;

    /// Merge `update` into step `step_id`. Unknown ids and illegal
    /// transitions are no-ops.
    fn update_step(&self, run_id: Uuid, step_id: Uuid, update: &StepUpdate) -> bool;

    /// Store the final artifact and clear `is_generating`.
    fn finish(&self, run_id: Uuid, generated_code: String) -> bool;

    /// Clear back to [`GenerationRun::empty`].
    fn reset(&self);

    /// Copy of the current run.
    fn snapshot(&self) -> GenerationRun;
}

pub struct InMemoryRunStore {
    state: watch::Sender<GenerationRun>,
    events: broadcast::Sender<RunEvent>,
}

impl Default for InMemoryRunStore {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl InMemoryRunStore {
    pub fn new(event_capacity: usize) -> Self {
        let (state, _) = watch::channel(GenerationRun::empty());
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { state, events }
    }

    /// Snapshot receiver; `changed()` resolves after every applied write.
    pub fn subscribe(&self) -> watch::Receiver<GenerationRun> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    /// Event stream for one subscriber. Lagged receivers skip what they
    /// missed; the stream ends when the store is dropped.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = RunEvent> + Send>> {
        let mut rx = self.events.subscribe();
        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "run event subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Box::pin(stream)
    }

    pub fn current_run_id(&self) -> Uuid {
        self.state.borrow().id
    }

    fn publish(&self, event: RunEvent) {
        // No subscribers is fine; the watch channel holds the state.
        let _ = self.events.send(event);
    }
}

impl RunStore for InMemoryRunStore {
    fn start_run(&self, run: &GenerationRun) {
        let mut run = run.clone();
        run.is_generating = true;
        run.generated_code = None;
        let event = RunEvent::RunStarted {
            run_id: run.id,
            project_name: run.project_name.clone(),
            estimated_tokens: run.estimated_tokens,
        };
        debug!(run_id = %run.id, "run started in store");
        self.state.send_replace(run);
        self.publish(event);
    }

    fn append_step(&self, run_id: Uuid, step: GenerationStep) -> bool {
        let event = RunEvent::StepAppended {
            run_id,
            step_id: step.id,
            role: step.role,
        };
        let applied = self.state.send_if_modified(|run| {
            if run.id != run_id || !run.is_generating {
                return false;
            }
            run.steps.push(step);
            true
        });

        if applied {
            self.publish(event);
        } else {
            debug!(run_id = %run_id, "append for inactive run ignored");
        }
        applied
    }

    fn update_step(&self, run_id: Uuid, step_id: Uuid, update: &StepUpdate) -> bool {
        let mut event = None;
        self.state.send_if_modified(|run| {
            if run.id != run_id {
                debug!(run_id = %run_id, step_id = %step_id, "update for inactive run ignored");
                return false;
            }
            let Some(step) = run.step_mut(step_id) else {
                warn!(run_id = %run_id, step_id = %step_id, "update for unknown step ignored");
                return false;
            };
            if let Err(e) = apply_update(step, update) {
                warn!(run_id = %run_id, step_id = %step_id, error = %e, "step update rejected");
                return false;
            }
            event = Some(RunEvent::StepUpdated {
                run_id,
                step_id,
                role: step.role,
                status: step.status,
            });
            run.total_tokens_used = run.step_token_sum();
            true
        });

        match event {
            Some(event) => {
                self.publish(event);
                true
            }
            None => false,
        }
    }

    fn finish(&self, run_id: Uuid, generated_code: String) -> bool {
        let mut total = 0;
        let applied = self.state.send_if_modified(|run| {
            if run.id != run_id || !run.is_generating {
                return false;
            }
            if let Some(open) = run.steps.iter().find(|s| !s.status.is_terminal()) {
                warn!(run_id = %run_id, role = %open.role, "finish with a non-terminal step ignored");
                return false;
            }
            run.total_tokens_used = run.step_token_sum();
            run.generated_code = Some(generated_code);
            run.is_generating = false;
            total = run.total_tokens_used;
            true
        });

        if applied {
            self.publish(RunEvent::RunFinished {
                run_id,
                total_tokens_used: total,
            });
        }
        applied
    }

    fn reset(&self) {
        self.state.send_replace(GenerationRun::empty());
        self.publish(RunEvent::RunReset);
    }

    fn snapshot(&self) -> GenerationRun {
        self.state.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_protocol::{Role, StepStatus};
    use tokio_stream::StreamExt;

    fn started_run(store: &InMemoryRunStore) -> GenerationRun {
        let run = GenerationRun::new("shop", "an online shop", 40);
        store.start_run(&run);
        run
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = InMemoryRunStore::default();
        assert_eq!(store.snapshot(), GenerationRun::empty());
    }

    #[test]
    fn test_step_lifecycle_updates_totals() {
        let store = InMemoryRunStore::default();
        let run = started_run(&store);
        let step = GenerationStep::pending(Role::Architect);
        let step_id = step.id;

        assert!(store.append_step(run.id, step));
        assert!(store.update_step(run.id, step_id, &StepUpdate::started(1)));
        assert!(store.update_step(run.id, step_id, &StepUpdate::completed("plan", 30, 2)));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.steps[0].status, StepStatus::Completed);
        assert_eq!(snapshot.total_tokens_used, 30);
        assert!(snapshot.is_generating);

        assert!(store.finish(run.id, "code".to_string()));
        let snapshot = store.snapshot();
        assert!(!snapshot.is_generating);
        assert_eq!(snapshot.generated_code.as_deref(), Some("code"));
    }

    #[test]
    fn test_unknown_step_is_noop() {
        let store = InMemoryRunStore::default();
        let run = started_run(&store);
        let before = store.snapshot();

        assert!(!store.update_step(run.id, Uuid::new_v4(), &StepUpdate::started(1)));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_illegal_transition_is_noop() {
        let store = InMemoryRunStore::default();
        let run = started_run(&store);
        let step = GenerationStep::pending(Role::Backend);
        let step_id = step.id;
        store.append_step(run.id, step);

        assert!(!store.update_step(run.id, step_id, &StepUpdate::completed("x", 1, 1)));
        assert_eq!(store.snapshot().steps[0].status, StepStatus::Pending);
    }

    #[test]
    fn test_writes_for_superseded_run_ignored() {
        let store = InMemoryRunStore::default();
        let old = started_run(&store);
        let old_step = GenerationStep::pending(Role::Architect);
        let old_step_id = old_step.id;
        store.append_step(old.id, old_step);

        let new = started_run(&store);
        assert!(!store.append_step(old.id, GenerationStep::pending(Role::Backend)));
        assert!(!store.update_step(old.id, old_step_id, &StepUpdate::started(1)));
        assert!(!store.finish(old.id, "stale".to_string()));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.id, new.id);
        assert!(snapshot.steps.is_empty());
        assert!(snapshot.generated_code.is_none());
    }

    #[test]
    fn test_finish_requires_terminal_steps() {
        let store = InMemoryRunStore::default();
        let run = started_run(&store);
        let step = GenerationStep::pending(Role::Architect);
        let step_id = step.id;
        store.append_step(run.id, step);
        store.update_step(run.id, step_id, &StepUpdate::started(1));

        assert!(!store.finish(run.id, "code".to_string()));
        assert!(store.snapshot().is_generating);
    }

    #[test]
    fn test_reset_shape_is_independent_of_history() {
        let fresh = InMemoryRunStore::default();
        fresh.reset();

        let used = InMemoryRunStore::default();
        let run = started_run(&used);
        used.append_step(run.id, GenerationStep::pending(Role::Architect));
        used.reset();

        assert_eq!(fresh.snapshot(), used.snapshot());
        assert_eq!(used.snapshot(), GenerationRun::empty());
    }

    #[tokio::test]
    async fn test_events_pushed_in_mutation_order() {
        let store = InMemoryRunStore::default();
        let mut events = store.events();

        let run = started_run(&store);
        let step = GenerationStep::pending(Role::Architect);
        let step_id = step.id;
        store.append_step(run.id, step);
        store.update_step(run.id, step_id, &StepUpdate::started(1));
        store.update_step(run.id, step_id, &StepUpdate::failed("boom", 2));
        store.finish(run.id, "code".to_string());
        store.reset();

        let mut received = Vec::new();
        for _ in 0..6 {
            received.push(events.next().await.unwrap());
        }

        assert!(matches!(received[0], RunEvent::RunStarted { .. }));
        assert!(matches!(received[1], RunEvent::StepAppended { role: Role::Architect, .. }));
        assert!(matches!(
            received[2],
            RunEvent::StepUpdated { status: StepStatus::InProgress, .. }
        ));
        assert!(matches!(
            received[3],
            RunEvent::StepUpdated { status: StepStatus::Failed, .. }
        ));
        assert_eq!(
            received[4],
            RunEvent::RunFinished {
                run_id: run.id,
                total_tokens_used: 0
            }
        );
        assert_eq!(received[5], RunEvent::RunReset);
    }

    #[tokio::test]
    async fn test_watch_subscriber_sees_changes() {
        let store = InMemoryRunStore::default();
        let mut rx = store.subscribe();

        let run = started_run(&store);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().id, run.id);

        store.append_step(run.id, GenerationStep::pending(Role::Architect));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().steps.len(), 1);
    }
}
