//! Directory structure and file generation for `.autocrea` initialization.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use crate::config::AUTOCREA_DIR;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options for initializing a `.autocrea` directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Directory in which `.autocrea` is created.
    pub target_dir: PathBuf,

    /// Overwrite template files in an existing `.autocrea` directory.
    pub force: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
        }
    }
}

/// Generate the `.autocrea` directory from the embedded templates.
///
/// ```text
/// .autocrea/
/// ├── config.toml
/// └── roles/
///     ├── architect.md
///     ├── backend.md
///     ├── devops.md
///     ├── frontend.md
///     └── security.md
/// ```
///
/// Returns the paths written, in order.
///
/// # Errors
///
/// Fails with [`InitError::DirectoryExists`] when `.autocrea` exists and
/// `force` is not set, or when a template is missing or a write fails.
pub async fn generate_autocrea_structure(options: InitOptions) -> InitResult<Vec<PathBuf>> {
    let ac_dir = options.target_dir.join(AUTOCREA_DIR);

    if ac_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(ac_dir));
    }

    fs::create_dir_all(ac_dir.join("roles")).map_err(|source| InitError::DirectoryCreate {
        path: ac_dir.join("roles"),
        source,
    })?;

    let mut written = vec![write_template_file(&ac_dir, "config.toml")?];
    for role_path in list_templates("roles/") {
        written.push(write_template_file(&ac_dir, &role_path)?);
    }

    debug!(dir = %ac_dir.display(), files = written.len(), "autocrea directory initialized");
    Ok(written)
}

/// Write one template below `ac_dir`, creating parent directories.
fn write_template_file(ac_dir: &Path, template_path: &str) -> InitResult<PathBuf> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = ac_dir.join(template_path);

    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path.clone(),
        source,
    })?;

    Ok(target_path)
}
