//! Error types for the reputation ledger

use thiserror::Error;
use trustmesh_core::CoreError;

#[derive(Error, Debug)]
pub enum ReputationError {
    #[error("Invalid ledger configuration: {0}")]
    InvalidConfig(String),

    #[error("Score repository error: {0}")]
    Repository(#[from] CoreError),

    #[error("Prometheus metric error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, ReputationError>;
