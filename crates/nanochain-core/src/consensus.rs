use tracing::{debug, info};

use crate::block::Block;
use crate::ledger::check_chain;
use crate::registry::PeerAddr;

/// Outcome of one conflict-resolution round.
#[derive(Clone, Debug)]
pub struct Resolution {
    pub replaced: bool,
    pub chain: Vec<Block>,
}

/// Longest-valid-chain rule over already-fetched peer chains. No I/O
/// happens here: the transport layer fetches each registered peer's chain
/// (skipping unreachable ones) and hands the survivors in.
///
/// Only chains that validate and are strictly longer than `local` qualify;
/// among those the single longest wins. Equal length never replaces the
/// local chain. When several qualifying chains share the maximum length,
/// the one from the lowest peer address wins, so the outcome does not
/// depend on iteration order.
pub fn resolve(local: &[Block], candidates: &[(PeerAddr, Vec<Block>)]) -> Resolution {
    let mut best: Option<&(PeerAddr, Vec<Block>)> = None;

    for candidate in candidates {
        let (peer, chain) = candidate;
        if chain.len() <= local.len() {
            debug!(peer = %peer, len = chain.len(), "peer chain not longer, ignoring");
            continue;
        }
        if let Err(err) = check_chain(chain) {
            debug!(peer = %peer, error = %err, "rejecting peer chain");
            continue;
        }
        let wins = match best {
            None => true,
            Some((best_peer, best_chain)) => {
                chain.len() > best_chain.len()
                    || (chain.len() == best_chain.len() && peer < best_peer)
            }
        };
        if wins {
            best = Some(candidate);
        }
    }

    match best {
        Some((peer, chain)) => {
            info!(peer = %peer, len = chain.len(), "adopting longer peer chain");
            Resolution {
                replaced: true,
                chain: chain.clone(),
            }
        }
        None => Resolution {
            replaced: false,
            chain: local.to_vec(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{validate_chain, Ledger};
    use crate::registry::PeerAddr;
    use std::sync::atomic::AtomicBool;

    fn peer(addr: &str) -> PeerAddr {
        PeerAddr::parse(addr).expect("test address parses")
    }

    /// Grow a valid chain of `blocks` total blocks on top of `base`,
    /// one faucet transaction of `amount` per block.
    fn grown_chain_with(base: &[Block], blocks: usize, amount: u64) -> Vec<Block> {
        let mut ledger = Ledger::new();
        ledger.replace_chain(base.to_vec());
        let cancel = AtomicBool::new(false);
        while ledger.chain().len() < blocks {
            ledger.new_transaction("faucet", "peer", amount);
            ledger.mine_block(&cancel).expect("not cancelled");
        }
        ledger.chain().to_vec()
    }

    fn grown_chain(base: &[Block], blocks: usize) -> Vec<Block> {
        grown_chain_with(base, blocks, 1)
    }

    #[test]
    fn genesis_node_adopts_longer_valid_chain() {
        let local = Ledger::new();
        let remote = grown_chain(local.chain(), 3);

        let outcome = resolve(local.chain(), &[(peer("10.0.0.2:5000"), remote.clone())]);
        assert!(outcome.replaced);
        assert_eq!(outcome.chain.len(), 3);
        assert_eq!(outcome.chain, remote);
        assert!(validate_chain(&outcome.chain));
    }

    #[test]
    fn shorter_and_equal_peers_never_replace() {
        let genesis_only = Ledger::new();
        let local = grown_chain(genesis_only.chain(), 5);
        let candidates = vec![
            (peer("10.0.0.2:5000"), grown_chain(&local[..1], 3)),
            (peer("10.0.0.3:5000"), grown_chain(&local[..1], 4)),
            (peer("10.0.0.4:5000"), grown_chain(&local[..1], 5)),
        ];

        let outcome = resolve(&local, &candidates);
        assert!(!outcome.replaced);
        assert_eq!(outcome.chain, local);
    }

    #[test]
    fn longer_but_invalid_chain_is_rejected() {
        let local = Ledger::new();
        let mut remote = grown_chain(local.chain(), 4);
        remote[2].transactions.push(crate::Transaction::new("evil", "evil", 9));

        let outcome = resolve(local.chain(), &[(peer("10.0.0.2:5000"), remote)]);
        assert!(!outcome.replaced);
        assert_eq!(outcome.chain.len(), 1);
    }

    #[test]
    fn single_longest_candidate_wins() {
        let local = Ledger::new();
        let candidates = vec![
            (peer("10.0.0.2:5000"), grown_chain(local.chain(), 2)),
            (peer("10.0.0.3:5000"), grown_chain(local.chain(), 4)),
            (peer("10.0.0.4:5000"), grown_chain(local.chain(), 3)),
        ];

        let outcome = resolve(local.chain(), &candidates);
        assert!(outcome.replaced);
        assert_eq!(outcome.chain.len(), 4);
    }

    #[test]
    fn max_length_tie_breaks_to_lowest_address() {
        let local = Ledger::new();
        let chain_b = grown_chain_with(local.chain(), 3, 2);
        let chain_a = grown_chain_with(local.chain(), 3, 1);
        assert_ne!(chain_a, chain_b);

        // Deliberately present the higher address first.
        let candidates = vec![
            (peer("10.0.0.9:5000"), chain_b),
            (peer("10.0.0.2:5000"), chain_a.clone()),
        ];

        let outcome = resolve(local.chain(), &candidates);
        assert!(outcome.replaced);
        assert_eq!(outcome.chain, chain_a);
    }

    #[test]
    fn no_candidates_is_a_no_op() {
        let local = Ledger::new();
        let outcome = resolve(local.chain(), &[]);
        assert!(!outcome.replaced);
        assert_eq!(outcome.chain, local.chain());
    }
}
