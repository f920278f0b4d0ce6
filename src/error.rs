//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::decode::DecodeError;
use crate::transform::{ExecutionError, RegistryError, StatementError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build function registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("failed to compile statement: {0}")]
    Statement(#[from] StatementError),
    #[error("transform failed: {0}")]
    Execution(#[from] ExecutionError),
}

pub type Result<T> = std::result::Result<T, Error>;
