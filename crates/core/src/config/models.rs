//! The loaded application configuration.

use crate::generation::prompts::PromptOverrides;
use ac_protocol::ServiceConfig;
use std::path::{Path, PathBuf};

/// Default location of persisted runs, relative to the project root.
pub const DEFAULT_HISTORY_DIR: &str = ".autocrea/runs";

/// Everything loaded from a project's `.autocrea/` directory.
///
/// ```rust,no_run
/// use ac_core::config::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("{} role overrides", config.prompt_overrides.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Settings from `config.toml`.
    pub service: ServiceConfig,

    /// Instructions from `roles/*.md`, keyed by the front matter role.
    pub prompt_overrides: PromptOverrides,

    /// Project root the configuration was loaded from.
    pub root: PathBuf,
}

impl AppConfig {
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Directory where finished runs are persisted. Relative paths resolve
    /// against [`Self::root`].
    pub fn history_dir(&self) -> PathBuf {
        let configured = self
            .service
            .generation
            .history_dir
            .as_deref()
            .unwrap_or(DEFAULT_HISTORY_DIR);
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
