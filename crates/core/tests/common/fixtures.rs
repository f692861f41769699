//! Test fixtures for projects, engines and requests.

use ac_core::engine::GenerationEngine;
use ac_core::generation::{Backend, GenerationClient};
use ac_protocol::GenerateRequest;
use std::sync::Arc;
use tempfile::TempDir;

/// A description of exactly `len` characters.
#[allow(dead_code)]
pub fn description_of_len(len: usize) -> String {
    "A web shop with carts, checkout and order history. "
        .chars()
        .cycle()
        .take(len)
        .collect()
}

/// Engine whose client has `backend` as its only (agent) backend.
#[allow(dead_code)]
pub fn engine_with(backend: Arc<dyn Backend>) -> GenerationEngine {
    GenerationEngine::new(Arc::new(GenerationClient::new().with_agent(backend)))
}

#[allow(dead_code)]
pub fn request(name: &str, description: &str) -> GenerateRequest {
    GenerateRequest {
        project_name: name.to_string(),
        project_description: description.to_string(),
    }
}

/// A project directory with `.autocrea/config.toml` holding `config_toml`.
///
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub fn create_test_project(config_toml: &str) -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let ac_dir = temp_dir.path().join(".autocrea");
    std::fs::create_dir_all(&ac_dir)?;
    std::fs::write(ac_dir.join("config.toml"), config_toml)?;
    Ok(temp_dir)
}
