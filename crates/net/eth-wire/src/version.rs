//! Support for representing the version of the `eth` protocol and of the
//! underlying devp2p transport.

use std::{fmt, str::FromStr};

/// Error thrown when failing to parse a valid [`EthVersion`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown eth protocol version: {0}")]
pub struct ParseVersionError(String);

/// The `eth` protocol version.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum EthVersion {
    /// The `eth` protocol version 62.
    Eth62 = 62,
    /// The `eth` protocol version 63, which added the node data and receipt
    /// queries.
    Eth63 = 63,
    /// The `eth` protocol version 64, which added the EIP-2124 fork id to the
    /// STATUS handshake.
    Eth64 = 64,
    /// The `eth` protocol version 65, which added pooled transaction
    /// announcements and queries.
    Eth65 = 65,
    /// The `eth` protocol version 66, which prefixed every request/response
    /// pair with a request id.
    Eth66 = 66,
}

impl EthVersion {
    /// The latest known eth version.
    pub const LATEST: Self = Self::Eth66;

    /// Returns `true` if the STATUS message of this version carries an
    /// EIP-2124 fork id.
    pub const fn has_fork_id(&self) -> bool {
        *self as u8 >= 64
    }

    /// Returns `true` if request/response messages of this version carry a
    /// request id.
    pub const fn has_request_ids(&self) -> bool {
        *self as u8 >= 66
    }
}

impl fmt::Display for EthVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "eth/{}", *self as u8)
    }
}

impl TryFrom<u8> for EthVersion {
    type Error = ParseVersionError;

    #[inline]
    fn try_from(version: u8) -> Result<Self, Self::Error> {
        match version {
            62 => Ok(Self::Eth62),
            63 => Ok(Self::Eth63),
            64 => Ok(Self::Eth64),
            65 => Ok(Self::Eth65),
            66 => Ok(Self::Eth66),
            _ => Err(ParseVersionError(version.to_string())),
        }
    }
}

impl TryFrom<&str> for EthVersion {
    type Error = ParseVersionError;

    #[inline]
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse::<u8>().map_err(|_| ParseVersionError(s.to_string()))?.try_into()
    }
}

impl FromStr for EthVersion {
    type Err = ParseVersionError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl From<EthVersion> for u8 {
    #[inline]
    fn from(version: EthVersion) -> Self {
        version as Self
    }
}

/// The devp2p (`p2p` capability) protocol version of the transport. Snappy
/// compression of message payloads arrived with version 5.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProtocolVersion {
    /// `p2p` version 4, no payload compression.
    V4 = 4,
    /// `p2p` version 5, snappy-compressed payloads.
    #[default]
    V5 = 5,
}

impl ProtocolVersion {
    /// Whether payloads on this transport are snappy compressed.
    pub const fn is_snappy(&self) -> bool {
        *self as u8 >= 5
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", *self as u8)
    }
}
