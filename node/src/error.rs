use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("consensus error: {0}")]
    Consensus(#[from] accord_consensus::ConsensusError),

    #[error("{0}")]
    Accord(#[from] accord_types::AccordError),

    #[error("vote signature is invalid")]
    SignatureInvalid,

    #[error("unknown vote phase {0}")]
    UnknownPhase(u8),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("chain {0} is not running")]
    ChainNotRunning(accord_types::ChainId),

    #[error("chain {0} is already running")]
    ChainAlreadyRunning(accord_types::ChainId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
