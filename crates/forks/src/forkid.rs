//! EIP-2124 fork identifiers: a compact fingerprint of the fork history a
//! node follows, exchanged in the `eth` STATUS handshake to weed out
//! incompatible peers before any expensive sync work.

use alloy_primitives::B256;
use alloy_rlp::{RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper};
use crc::Crc;
use std::fmt;

const CRC32: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// The CRC-32 checksum of the genesis hash and all passed fork block numbers,
/// each folded in as 8 big-endian bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct ForkHash(pub [u8; 4]);

impl fmt::Debug for ForkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForkHash(0x{})", alloy_primitives::hex::encode(self.0))
    }
}

impl ForkHash {
    /// Computes the fork hash for a genesis hash and the ordered list of
    /// passed fork blocks.
    pub fn new(genesis: B256, passed_forks: impl IntoIterator<Item = u64>) -> Self {
        let mut digest = CRC32.digest();
        digest.update(genesis.as_slice());
        for block in passed_forks {
            digest.update(&block.to_be_bytes());
        }
        Self(digest.finalize().to_be_bytes())
    }
}

/// A fork identifier as defined by EIP-2124.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, RlpEncodable, RlpDecodable)]
pub struct ForkId {
    /// CRC-32 checksum of genesis hash and passed fork blocks.
    pub hash: ForkHash,
    /// The next upcoming fork block, or 0 if none is announced.
    pub next: u64,
}

/// Error variants of fork id validation, each fatal to the handshake.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The remote advertises, as upcoming, a fork that has already passed
    /// locally: one of the two nodes missed an update.
    #[error(
        "local node is on an incompatible chain or needs a software update: local={local:?}, remote={remote:?}"
    )]
    LocalIncompatibleOrStale {
        /// Our fork id.
        local: ForkId,
        /// The remote's fork id.
        remote: ForkId,
    },
    /// The remote's fork hash matches none of the fork hashes this chain has
    /// ever had.
    #[error("remote advertises unknown fork hash: {0:?}")]
    UnknownForkHash(ForkHash),
    /// The remote is on an older fork and does not announce the fork that we
    /// know followed it.
    #[error("remote node is outdated and needs a software update: local={local:?}, remote={remote:?}")]
    RemoteStale {
        /// Our fork id.
        local: ForkId,
        /// The remote's fork id.
        remote: ForkId,
    },
}

/// Validates remote fork ids against the local fork history.
///
/// The filter precomputes the fork hash of every era of the chain (genesis,
/// after the first fork, after the second, …) together with the fork block
/// that ended the era.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkFilter {
    /// Fork hash of each era and the block at which the next era begins
    /// (0 for the last announced era).
    cache: Vec<ForkId>,
    /// Block numbers at which the eras after genesis begin.
    forks: Vec<u64>,
    /// The local chain head.
    head: u64,
}

impl ForkFilter {
    /// Creates a filter for a chain with the given genesis hash and fork
    /// blocks. Fork blocks are deduplicated (forks activating together share
    /// one fork id entry) and block 0 is part of the genesis era.
    pub fn new(head: u64, genesis: B256, forks: impl IntoIterator<Item = u64>) -> Self {
        let mut forks: Vec<u64> = forks.into_iter().filter(|block| *block > 0).collect();
        forks.sort_unstable();
        forks.dedup();

        let mut cache = Vec::with_capacity(forks.len() + 1);
        for era in 0..=forks.len() {
            let hash = ForkHash::new(genesis, forks[..era].iter().copied());
            let next = forks.get(era).copied().unwrap_or_default();
            cache.push(ForkId { hash, next });
        }

        Self { cache, forks, head }
    }

    /// Moves the local head, e.g. after importing a block.
    pub fn set_head(&mut self, head: u64) {
        self.head = head;
    }

    /// The local chain head this filter validates against.
    pub const fn head(&self) -> u64 {
        self.head
    }

    /// The fork id of the era the local head is in.
    pub fn current(&self) -> ForkId {
        let era = self.forks.iter().take_while(|block| **block <= self.head).count();
        self.cache[era]
    }

    /// Validates a remote fork id against the local fork history per
    /// EIP-2124.
    pub fn validate(&self, remote: ForkId) -> Result<(), ValidationError> {
        let local = self.current();

        // 1) Same era. Compatible unless the remote announces, as still
        //    upcoming, a fork our head already passed.
        if remote.hash == local.hash {
            if remote.next != 0 && self.head >= remote.next {
                return Err(ValidationError::LocalIncompatibleOrStale { local, remote })
            }
            return Ok(())
        }

        // 2) Different era: it must at least be one this chain has had (or
        //    will have, if the remote is ahead of us).
        let Some(era) = self.cache.iter().position(|id| id.hash == remote.hash) else {
            return Err(ValidationError::UnknownForkHash(remote.hash))
        };

        // 3) A remote on an older era must announce the fork block that we
        //    know ended that era, otherwise it missed an update.
        let expected_next = self.cache[era].next;
        if expected_next != 0 && expected_next <= self.head && remote.next != expected_next {
            return Err(ValidationError::RemoteStale { local, remote })
        }

        Ok(())
    }
}
