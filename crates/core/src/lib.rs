//! # ac-core
//!
//! Generation orchestration core for autocrea.
//!
//! This crate provides:
//! - A generation client over a trigger-and-poll agent backend and a
//!   single-call inference backend
//! - The step sequencer that runs every role in a fixed order
//! - An observable run store and a manager for background runs
//! - The request boundary with token allowance and run history
//! - Configuration loading from `.autocrea/` and its initialization
//!
//! ## Modules
//!
//! - [`generation`]: Backends, prompts, routing and token estimation
//! - [`engine`]: Step sequencer
//! - [`state`]: Step state machine, run store and run manager
//! - [`service`]: Request handling, usage ledger and run repository
//! - [`config`]: Configuration loading
//! - [`init`]: `.autocrea/` scaffolding from embedded templates

pub mod config;
pub mod engine;
pub mod generation;
pub mod init;
pub mod service;
pub mod state;
