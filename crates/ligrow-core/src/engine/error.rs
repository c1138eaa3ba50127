use super::config::ConfigError;
use super::pool::PoolError;
use crate::core::models::ligand::LigandError;
use crate::core::oracle::OracleError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Ligand error: {source}")]
    Ligand {
        #[from]
        source: LigandError,
    },

    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Task pool error: {source}")]
    Pool {
        #[from]
        source: PoolError,
    },

    #[error("Failed to write output '{path}': {message}", path = path.display())]
    Output { path: PathBuf, message: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl From<OracleError> for EngineError {
    fn from(error: OracleError) -> Self {
        match error {
            OracleError::Unavailable(message) => Self::OracleUnavailable(message),
        }
    }
}
