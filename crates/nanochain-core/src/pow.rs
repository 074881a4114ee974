use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::constants::{CANCEL_CHECK_INTERVAL, POW_DIFFICULTY};

/// Does SHA-256 of `"{last_proof}{proof}"` start with `POW_DIFFICULTY`
/// zero hex characters? Verification is a single hash; discovery is an
/// expected `16^POW_DIFFICULTY` trials.
pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
    let guess = format!("{last_proof}{proof}");
    let digest = Sha256::digest(guess.as_bytes());
    leading_zero_hex_chars(&digest[..]) >= POW_DIFFICULTY
}

/// Number of leading zero characters the hex rendering of `digest` would
/// have, counted a nibble at a time without allocating the string.
pub fn leading_zero_hex_chars(digest: &[u8]) -> usize {
    let mut total = 0;
    for byte in digest {
        if *byte == 0 {
            total += 2;
        } else {
            if byte >> 4 == 0 {
                total += 1;
            }
            break;
        }
    }
    total
}

/// Search proofs from 0 upward and return the first one satisfying
/// [`valid_proof`]. Deterministic: re-mining against the same last proof
/// always lands on the same solution.
pub fn mine(last_proof: u64) -> u64 {
    let cancel = AtomicBool::new(false);
    mine_cancellable(last_proof, &cancel).expect("uncancelled search runs to a solution")
}

/// [`mine`], but aborting with `None` once `cancel` is observed set. The
/// flag is sampled every [`CANCEL_CHECK_INTERVAL`] trials so a node can
/// stop a miner whose work has become moot (shutdown, adopted peer chain).
pub fn mine_cancellable(last_proof: u64, cancel: &AtomicBool) -> Option<u64> {
    let mut proof = 0u64;
    loop {
        if valid_proof(last_proof, proof) {
            return Some(proof);
        }
        if proof % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            return None;
        }
        proof += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn leading_zero_hex_chars_examples() {
        assert_eq!(leading_zero_hex_chars(&[0xab, 0xcd]), 0);
        assert_eq!(leading_zero_hex_chars(&[0x0b, 0xcd]), 1);
        assert_eq!(leading_zero_hex_chars(&[0x00, 0xcd]), 2);
        assert_eq!(leading_zero_hex_chars(&[0x00, 0x0d]), 3);
        assert_eq!(leading_zero_hex_chars(&[0x00, 0x00]), 4);
    }

    #[test]
    fn mined_proofs_verify() {
        for last_proof in [0u64, 1, 100, 35293, u64::MAX] {
            let proof = mine(last_proof);
            assert!(valid_proof(last_proof, proof));
        }
    }

    #[test]
    fn mining_is_deterministic() {
        assert_eq!(mine(100), mine(100));
        assert_eq!(mine(42), mine(42));
    }

    #[test]
    fn random_candidates_rarely_verify() {
        // Acceptance probability is 16^-POW_DIFFICULTY ~= 1.5e-5 at
        // difficulty 4, so a thousand uniform candidates should produce
        // at most a stray hit or two.
        let mut rng = StdRng::seed_from_u64(42);
        let hits = (0..1000)
            .filter(|_| valid_proof(100, rng.gen::<u64>()))
            .count();
        assert!(hits <= 2, "{hits} random proofs passed validation");
    }

    #[test]
    fn pre_cancelled_search_returns_none() {
        let cancel = AtomicBool::new(true);
        assert_eq!(mine_cancellable(100, &cancel), None);
    }

    #[test]
    fn uncancelled_search_matches_mine() {
        let cancel = AtomicBool::new(false);
        assert_eq!(mine_cancellable(100, &cancel), Some(mine(100)));
    }
}
