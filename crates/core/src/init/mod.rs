//! Initialization module for creating `.autocrea` directory structures.
//!
//! Generates a `.autocrea/` directory with:
//! - Service configuration (`config.toml`)
//! - Per-role instruction overrides (`roles/*.md`)
//!
//! # Example
//!
//! ```no_run
//! use ac_core::init::{generate_autocrea_structure, InitOptions};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = InitOptions {
//!     target_dir: PathBuf::from("."),
//!     force: false,
//! };
//!
//! generate_autocrea_structure(options).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod templates;

pub use error::{InitError, InitResult};
pub use generator::{generate_autocrea_structure, InitOptions};
pub use templates::{get_template, list_templates};
