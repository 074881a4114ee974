//! Chain core of a minimal proof-of-work ledger: block/transaction data
//! model, the work puzzle, the ledger (chain + pending pool), the
//! longest-valid-chain conflict resolver, and the peer registry. All state
//! is process-memory only; transport and persistence live elsewhere.

pub mod block;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod pow;
pub mod registry;

pub use block::{genesis_block, Block, Hash, Transaction, GENESIS_PREVIOUS_HASH};
pub use consensus::{resolve, Resolution};
pub use error::LedgerError;
pub use ledger::{check_chain, validate_chain, Ledger, MiningTemplate};
pub use registry::{NodeRegistry, PeerAddr};
