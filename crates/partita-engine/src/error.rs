use partita_ir::{BlockId, GraphError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] GraphError),
    #[error("Configuration error: options reference unknown block '{0}'")]
    UnknownBlock(BlockId),
    #[error("Configuration error: worker pool could not be started: {0}")]
    WorkerPool(String),
    #[error("Analysis error in block '{block}': {message}")]
    Analysis { block: BlockId, message: String },
    #[error("Solver error: {0}")]
    Solver(String),
}
