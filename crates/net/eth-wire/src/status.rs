use crate::EthVersion;
use alloy_primitives::{hex, B256, U256};
use alloy_rlp::{BufMut, Decodable, Encodable, RlpDecodable, RlpEncodable};
use ember_forks::ForkId;
use std::fmt::{self, Debug, Display};

/// The status message used in the `eth` protocol handshake, for protocol
/// versions 64 and up, which carry an EIP-2124 fork id.
///
/// The total difficulty is not guaranteed to correspond to the block hash and
/// must be treated as untrusted.
#[derive(Copy, Clone, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct Status {
    /// The protocol version, e.g. 66 for peers running `eth/66`.
    pub version: u8,

    /// The network id, as introduced in
    /// [EIP-155](https://eips.ethereum.org/EIPS/eip-155).
    pub chain: u64,

    /// Total difficulty of the best chain.
    pub total_difficulty: U256,

    /// The hash of the peer's best known block.
    pub blockhash: B256,

    /// The genesis hash of the peer's chain.
    pub genesis: B256,

    /// The fork identifier, a [CRC32
    /// checksum](https://en.wikipedia.org/wiki/Cyclic_redundancy_check#CRC-32_algorithm)
    /// of the peer's fork history as defined by
    /// [EIP-2124](https://eips.ethereum.org/EIPS/eip-2124).
    pub forkid: ForkId,
}

impl Status {
    /// Helper for returning a builder for the status message.
    pub fn builder() -> StatusBuilder {
        Default::default()
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Status {{ version: {}, chain: {}, total_difficulty: {}, blockhash: {}, genesis: {}, forkid: {:?} }}",
            self.version,
            self.chain,
            self.total_difficulty,
            hex::encode(self.blockhash),
            hex::encode(self.genesis),
            self.forkid
        )
    }
}

impl Debug for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Default for Status {
    fn default() -> Self {
        Self {
            version: EthVersion::LATEST as u8,
            chain: 1,
            total_difficulty: U256::ZERO,
            blockhash: B256::ZERO,
            genesis: B256::ZERO,
            forkid: ForkId::default(),
        }
    }
}

/// The pre-fork-id status message of protocol versions 62 and 63.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, RlpEncodable, RlpDecodable)]
pub struct StatusLegacy {
    /// The protocol version.
    pub version: u8,
    /// The network id.
    pub chain: u64,
    /// Total difficulty of the best chain.
    pub total_difficulty: U256,
    /// The hash of the peer's best known block.
    pub blockhash: B256,
    /// The genesis hash of the peer's chain.
    pub genesis: B256,
}

/// Either wire shape of the STATUS message, picked by the negotiated
/// protocol version at decode time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StatusMessage {
    /// The `eth/62`–`eth/63` status without a fork id.
    Legacy(StatusLegacy),
    /// The `eth/64`-and-later status with a fork id.
    Eth64(Status),
}

impl StatusMessage {
    /// Returns the protocol version field.
    pub const fn version(&self) -> u8 {
        match self {
            Self::Legacy(status) => status.version,
            Self::Eth64(status) => status.version,
        }
    }

    /// Returns the network id field.
    pub const fn chain(&self) -> u64 {
        match self {
            Self::Legacy(status) => status.chain,
            Self::Eth64(status) => status.chain,
        }
    }

    /// Returns the total difficulty field.
    pub const fn total_difficulty(&self) -> U256 {
        match self {
            Self::Legacy(status) => status.total_difficulty,
            Self::Eth64(status) => status.total_difficulty,
        }
    }

    /// Returns the best block hash field.
    pub const fn blockhash(&self) -> B256 {
        match self {
            Self::Legacy(status) => status.blockhash,
            Self::Eth64(status) => status.blockhash,
        }
    }

    /// Returns the genesis hash field.
    pub const fn genesis(&self) -> B256 {
        match self {
            Self::Legacy(status) => status.genesis,
            Self::Eth64(status) => status.genesis,
        }
    }

    /// Returns the fork id, for status messages that carry one.
    pub const fn forkid(&self) -> Option<ForkId> {
        match self {
            Self::Legacy(_) => None,
            Self::Eth64(status) => Some(status.forkid),
        }
    }

    pub(crate) fn decode_for_version(
        version: EthVersion,
        buf: &mut &[u8],
    ) -> alloy_rlp::Result<Self> {
        if version.has_fork_id() {
            Ok(Self::Eth64(Status::decode(buf)?))
        } else {
            Ok(Self::Legacy(StatusLegacy::decode(buf)?))
        }
    }
}

impl Encodable for StatusMessage {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            Self::Legacy(status) => status.encode(out),
            Self::Eth64(status) => status.encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            Self::Legacy(status) => status.length(),
            Self::Eth64(status) => status.length(),
        }
    }
}

/// Builder for [`Status`] messages.
#[derive(Debug, Default)]
pub struct StatusBuilder {
    status: Status,
}

impl StatusBuilder {
    /// Consumes the type and creates the actual [`Status`] message.
    pub const fn build(self) -> Status {
        self.status
    }

    /// Sets the protocol version.
    pub const fn version(mut self, version: EthVersion) -> Self {
        self.status.version = version as u8;
        self
    }

    /// Sets the network id.
    pub const fn chain(mut self, chain: u64) -> Self {
        self.status.chain = chain;
        self
    }

    /// Sets the total difficulty.
    pub const fn total_difficulty(mut self, total_difficulty: U256) -> Self {
        self.status.total_difficulty = total_difficulty;
        self
    }

    /// Sets the best block hash.
    pub const fn blockhash(mut self, blockhash: B256) -> Self {
        self.status.blockhash = blockhash;
        self
    }

    /// Sets the genesis hash.
    pub const fn genesis(mut self, genesis: B256) -> Self {
        self.status.genesis = genesis;
        self
    }

    /// Sets the fork id.
    pub const fn forkid(mut self, forkid: ForkId) -> Self {
        self.status.forkid = forkid;
        self
    }
}
