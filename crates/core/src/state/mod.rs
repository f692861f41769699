//! State management for generation runs.
//!
//! This module provides:
//! - The step state machine
//! - The observable run store the engine writes into
//! - RunManager for coordinating runs in background tasks

pub mod manager;
pub mod step;
pub mod store;

pub use manager::{RunInfo, RunManager};
pub use step::TransitionError;
pub use store::{InMemoryRunStore, RunStore};
