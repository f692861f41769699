//! Generation Client: role-scoped calls against the configured backends.
//!
//! This module provides the `Backend` trait (Adapter Pattern), the adapters
//! for the trigger-and-poll and single-call backend shapes, and the
//! `GenerationClient` that routes, prompts and meters each call.

pub mod adapters;
pub mod base;
pub mod client;
pub mod factory;
pub mod prompts;
pub mod router;
pub mod tokens;

pub use adapters::MockBackend;
pub use base::{Backend, BackendOutput, BackendRequest, GenerationError};
pub use client::{ConversationTurn, Generation, GenerationClient};
pub use factory::{build_client, build_offline_client};
pub use prompts::PromptOverrides;
pub use router::BackendChoice;
