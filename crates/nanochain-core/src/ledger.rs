use std::sync::atomic::AtomicBool;

use crate::block::{genesis_block, unix_millis, Block, Hash, Transaction};
use crate::error::LedgerError;
use crate::pow;

/// Snapshot of the chain tip a miner searches against. Taken under a read
/// lock, handed to a worker thread, and checked again at commit time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MiningTemplate {
    pub last_proof: u64,
    pub previous_hash: Hash,
}

/// The single-node ledger: the block chain plus the pool of transactions
/// accepted but not yet mined. One instance lives for the process; callers
/// serialize mutation behind their own lock (see nanochain-node).
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

impl Ledger {
    /// A fresh ledger holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![genesis_block()],
            pending: Vec::new(),
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    /// The chain never shrinks below genesis, so a last block always exists.
    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("chain starts at genesis")
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Queue a transaction and return the index of the block expected to
    /// contain it (the next one mined). A hint, not a commitment.
    pub fn new_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        self.pending.push(Transaction::new(sender, recipient, amount));
        self.last_block().index + 1
    }

    /// Tip snapshot for an off-lock proof-of-work search.
    pub fn mining_template(&self) -> MiningTemplate {
        let last = self.last_block();
        MiningTemplate {
            last_proof: last.proof,
            previous_hash: last.hash(),
        }
    }

    /// Seal the pending pool into a new block under `proof`, linked to the
    /// tip the template was taken from. Fails with [`LedgerError::StaleTip`]
    /// if the tip moved since (a concurrent mine or chain replacement won);
    /// the pool is untouched in that case. Snapshot-and-clear of the pool
    /// and the append happen together, so a transaction queued mid-mine is
    /// either fully in the new block or fully still pending.
    pub fn commit_block(&mut self, proof: u64, previous_hash: Hash) -> Result<Block, LedgerError> {
        if self.last_block().hash() != previous_hash {
            return Err(LedgerError::StaleTip);
        }
        let block = Block {
            index: self.last_block().index + 1,
            timestamp: unix_millis(),
            transactions: std::mem::take(&mut self.pending),
            proof,
            previous_hash,
        };
        self.chain.push(block.clone());
        Ok(block)
    }

    /// Synchronous mine: proof-of-work against the current tip, then
    /// commit. Returns `None` only if cancelled mid-search. Holding
    /// `&mut self` pins the tip, so the commit cannot go stale.
    pub fn mine_block(&mut self, cancel: &AtomicBool) -> Option<Block> {
        let template = self.mining_template();
        let proof = pow::mine_cancellable(template.last_proof, cancel)?;
        let block = self
            .commit_block(proof, template.previous_hash)
            .expect("tip is pinned under &mut self");
        Some(block)
    }

    /// Adopt `chain` wholesale. The caller (consensus resolution) must have
    /// validated it already. The pending pool is left as-is: unmined
    /// transactions stay pending even if the adopted chain already contains
    /// duplicates of them. Accepted tradeoff, not reconciled.
    pub fn replace_chain(&mut self, chain: Vec<Block>) {
        self.chain = chain;
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk `chain` and verify every adjacent pair: stored `previous_hash`
/// must equal the recomputed digest of the prior block, and the pair of
/// proofs must satisfy the work predicate. Block 0 is taken as-is; an
/// empty chain is invalid.
pub fn check_chain(chain: &[Block]) -> Result<(), LedgerError> {
    let Some(first) = chain.first() else {
        return Err(LedgerError::InvalidChain("empty chain"));
    };
    let mut prev = first;
    for block in &chain[1..] {
        if block.previous_hash != prev.hash() {
            return Err(LedgerError::InvalidChain("broken hash linkage"));
        }
        if !pow::valid_proof(prev.proof, block.proof) {
            return Err(LedgerError::InvalidChain("proof of work does not verify"));
        }
        prev = block;
    }
    Ok(())
}

/// Boolean form of [`check_chain`].
pub fn validate_chain(chain: &[Block]) -> bool {
    check_chain(chain).is_ok()
}
