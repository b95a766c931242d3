use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("no eligible agents for round {round_index}")]
    EmptyRound { round_index: u64 },

    #[error("round index must start at 1")]
    ZeroRound,

    #[error("block interval must be positive")]
    ZeroInterval,

    #[error("a chain must cover at least one block")]
    EmptyChain,

    #[error("a master chain already exists")]
    MasterExists,

    #[error("no master chain has been initialized")]
    MasterMissing,

    #[error("unknown chain index {0}")]
    UnknownChain(usize),

    #[error("chain {0} is already the master")]
    AlreadyMaster(usize),

    #[error("{0}")]
    Other(String),
}
