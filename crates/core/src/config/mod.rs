//! Configuration loading and management.
//!
//! This module loads the `.autocrea/` directory: `config.toml` for service
//! settings and `roles/*.md` for per-role instruction overrides.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, AUTOCREA_DIR};
pub use models::AppConfig;
