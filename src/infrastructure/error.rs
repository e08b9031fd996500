//! Infrastructure-level errors (wraps application errors)

use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;

/// Errors from the process environment and the config files the CLI manages.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("cannot determine working directory")]
    WorkingDir(#[source] std::io::Error),

    #[error("config file already exists: {}", path.display())]
    ConfigExists { path: PathBuf },

    #[error("cannot write config file {}", path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
