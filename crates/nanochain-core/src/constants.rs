pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Leading zero hex characters a proof digest must carry.
pub const POW_DIFFICULTY: usize = 4;

/// How often the mining loop samples its cancel flag, in trials.
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// Fixed proof carried by the genesis block.
pub const GENESIS_PROOF: u64 = 100;
/// Block numbering starts at 1, so genesis is block 1.
pub const GENESIS_INDEX: u64 = 1;
