use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use url::Url;

use crate::error::LedgerError;

/// A peer address normalized to its authority (`host` or `host:port`)
/// form. Two spellings of the same peer ("http://10.0.0.2:5000/",
/// "10.0.0.2:5000") normalize to one value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddr(String);

impl PeerAddr {
    /// Accepts a full URL or a bare `host[:port]` and keeps the authority.
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        let invalid = || LedgerError::InvalidAddress(input.to_string());

        let text = if input.contains("://") {
            input.to_string()
        } else {
            format!("http://{input}")
        };
        let url = Url::parse(&text).map_err(|_| invalid())?;
        let host = url.host_str().ok_or_else(invalid)?;

        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self(authority))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of peers consulted during conflict resolution. Deduplicated,
/// sorted, grow-only (peer churn and health checks are out of scope).
#[derive(Debug, Default)]
pub struct NodeRegistry {
    peers: BTreeSet<PeerAddr>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse, normalize, and insert. Re-registering a known peer is a no-op.
    pub fn register(&mut self, address: &str) -> Result<PeerAddr, LedgerError> {
        let peer = PeerAddr::parse(address)?;
        self.peers.insert(peer.clone());
        Ok(peer)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerAddr> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
