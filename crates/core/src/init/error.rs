//! Failures while scaffolding `.autocrea/`.

use std::path::PathBuf;
use thiserror::Error;

pub type InitResult<T> = Result<T, InitError>;

#[derive(Debug, Error)]
pub enum InitError {
    /// Refused without `force` so hand-edited role prompts survive.
    #[error("{0} already exists; pass --force to rewrite its templates")]
    DirectoryExists(PathBuf),

    /// The binary was built without this embedded template.
    #[error("embedded template '{0}' is missing")]
    TemplateNotFound(String),

    #[error("cannot create {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}
