use thiserror::Error;

/// Failure taxonomy of the chain core. Nothing here is fatal to the
/// process: bad input is rejected, unreachable peers are skipped.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A peer registration input that does not parse as a host/URI.
    #[error("invalid peer address: {0:?}")]
    InvalidAddress(String),

    /// Transport failure fetching a peer's chain during resolution.
    /// The peer is skipped for that round.
    #[error("peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    /// A fetched or submitted chain failed hash-linkage or proof-of-work
    /// validation and was rejected.
    #[error("invalid chain: {0}")]
    InvalidChain(&'static str),

    /// The chain tip moved between taking a mining template and committing
    /// the mined block (a concurrent mine or chain replacement won).
    #[error("chain tip moved while mining")]
    StaleTip,
}
