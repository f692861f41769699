//! # ac-protocol
//!
//! Shared data model and wire payloads for autocrea.
//!
//! This crate defines the structures exchanged between the generation core,
//! its observers (CLI, web client) and the request boundary:
//! - Generation roles and their fixed execution order
//! - Per-step and per-run generation state
//! - Push events emitted by the run store
//! - Request/response JSON payloads
//! - Service configuration tables from `.autocrea/config.toml`
//!
//! ## Modules
//!
//! - [`role_models`]: The generation role enumeration
//! - [`run_models`]: Steps, runs and partial step updates
//! - [`ipc`]: Events pushed from the run store to observers
//! - [`api_models`]: Request/response payloads of the generation endpoint
//! - [`config_models`]: Service configuration from config.toml
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, and uuid
//! - TypeScript generation: All types derive `TS` for the web client
//! - Independent compilation: No dependencies on other autocrea crates

pub mod api_models;
pub mod config_models;
pub mod ipc;
pub mod role_models;
pub mod run_models;

// Re-export all public types for convenience
pub use api_models::*;
pub use config_models::*;
pub use ipc::*;
pub use role_models::*;
pub use run_models::*;
