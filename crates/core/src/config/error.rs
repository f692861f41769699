//! Failures while reading `.autocrea/`.
//!
//! Every variant names the file it came from so the CLI can point at it.

use ac_protocol::Role;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid TOML: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A role override whose front matter is missing or lacks `role:`.
    #[error("bad front matter in {path}: {reason}")]
    MarkdownParse { path: PathBuf, reason: String },

    #[error("cannot list role overrides in {path}: {source}")]
    DirectoryWalk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// Settings that parse but cannot drive a backend, e.g. zero poll attempts.
    #[error("invalid setting in {path}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("override for role '{role}' in {path} has no instruction text")]
    EmptyRoleOverride { path: PathBuf, role: Role },

    #[error("role '{role}' is overridden twice: {first} and {path}")]
    DuplicateRoleOverride {
        path: PathBuf,
        first: PathBuf,
        role: Role,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
