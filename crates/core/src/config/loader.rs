//! Configuration file loader for the `.autocrea/` directory.
//!
//! - `config.toml`: generation, backend and routing settings
//! - `roles/*.md`: instruction overrides with YAML front matter naming the role

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use crate::generation::prompts::PromptOverrides;
use ac_protocol::{Role, ServiceConfig};
use gray_matter::engine::YAML;
use gray_matter::Matter;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Name of the per-project configuration directory.
pub const AUTOCREA_DIR: &str = ".autocrea";

#[derive(Debug, Deserialize)]
struct RoleFrontMatter {
    role: Role,
}

/// Loads all configuration from the `.autocrea/` directory under `root`.
///
/// Missing directories or files yield defaults rather than errors.
///
/// # Errors
///
/// Returns `ConfigError` if a file exists but cannot be read, has invalid
/// TOML or front matter, or holds values that cannot be used (for example
/// two override files for the same role).
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let ac_dir = root.join(AUTOCREA_DIR);

    if !ac_dir.exists() {
        return Ok(AppConfig::with_root(root));
    }

    let service = load_service_config(&ac_dir)?;
    let prompt_overrides = load_role_overrides(&ac_dir)?;

    debug!(
        root = %root.display(),
        agent = service.agent.is_some(),
        coder = service.coder.is_some(),
        overrides = prompt_overrides.len(),
        "configuration loaded"
    );

    Ok(AppConfig {
        service,
        prompt_overrides,
        root: root.to_path_buf(),
    })
}

/// Loads service settings from `config.toml`.
fn load_service_config(ac_dir: &Path) -> ConfigResult<ServiceConfig> {
    let config_path = ac_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(ServiceConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let config: ServiceConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?;

    validate_service_config(&config).map_err(|reason| ConfigError::InvalidConfig {
        path: config_path,
        reason,
    })?;

    Ok(config)
}

fn validate_service_config(config: &ServiceConfig) -> Result<(), String> {
    if let Some(agent) = &config.agent {
        if agent.max_poll_attempts == 0 {
            return Err("[agent] max_poll_attempts must be at least 1".to_string());
        }
        if agent.poll_interval_ms == 0 {
            return Err("[agent] poll_interval_ms must be greater than 0".to_string());
        }
    }
    if let Some(coder) = &config.coder {
        if !(0.0..=2.0).contains(&coder.temperature) {
            return Err(format!(
                "[coder] temperature {} is outside 0.0..=2.0",
                coder.temperature
            ));
        }
    }
    Ok(())
}

/// Loads per-role instruction overrides from `roles/*.md`.
fn load_role_overrides(ac_dir: &Path) -> ConfigResult<PromptOverrides> {
    let roles_dir = ac_dir.join("roles");
    let mut overrides = PromptOverrides::new();
    let mut sources: HashMap<Role, PathBuf> = HashMap::new();

    if !roles_dir.exists() {
        return Ok(overrides);
    }

    for entry in WalkDir::new(&roles_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: roles_dir.clone(),
            source,
        })?;

        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let matter = Matter::<YAML>::new();
        let result = matter.parse(&content);

        let front: RoleFrontMatter = result
            .data
            .ok_or_else(|| ConfigError::MarkdownParse {
                path: path.to_path_buf(),
                reason: "Missing YAML front matter".to_string(),
            })?
            .deserialize()
            .map_err(|e| ConfigError::MarkdownParse {
                path: path.to_path_buf(),
                reason: format!("Failed to deserialize front matter: {}", e),
            })?;

        let instruction = result.content.trim();
        if instruction.is_empty() {
            return Err(ConfigError::EmptyRoleOverride {
                path: path.to_path_buf(),
                role: front.role,
            });
        }

        if let Some(first) = sources.insert(front.role, path.to_path_buf()) {
            return Err(ConfigError::DuplicateRoleOverride {
                path: path.to_path_buf(),
                first,
                role: front.role,
            });
        }
        overrides.insert(front.role, instruction);
        debug!(role = %front.role, path = %path.display(), "role override loaded");
    }

    Ok(overrides)
}
