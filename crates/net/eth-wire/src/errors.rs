//! Error types of the `eth` streams.

use crate::{DisconnectReason, EthMessageID, EthVersion, ParseVersionError};
use alloy_primitives::B256;
use ember_forks::ValidationError;
use ember_primitives::GotExpected;
use std::io;

/// Errors when sending or receiving `eth` messages.
#[derive(Debug, thiserror::Error)]
pub enum EthStreamError {
    /// Transport error of the underlying byte stream.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Failed to parse a protocol version.
    #[error(transparent)]
    ParseVersion(#[from] ParseVersionError),
    /// Fatal failure of the STATUS handshake.
    #[error(transparent)]
    EthHandshakeError(#[from] EthHandshakeError),
    /// The payload could not be decoded; the peer is speaking garbage.
    #[error(transparent)]
    InvalidMessage(#[from] MessageError),
    /// Attempted to send a message the negotiated version does not allow.
    #[error("message {message:?} is not allowed for version {version}")]
    MessageNotSupported {
        /// The negotiated version.
        version: EthVersion,
        /// The offending message code.
        message: EthMessageID,
    },
    /// Request id bookkeeping failed: a reused outbound id, or a response
    /// that matches no outstanding request.
    #[error(transparent)]
    Request(#[from] RequestError),
    /// A message exceeded the decoded size limit.
    #[error("message size ({0}) exceeds max length (10MB)")]
    MessageTooBig(usize),
    /// Snappy compression or decompression failed.
    #[error("snappy error: {0}")]
    Snappy(#[from] snap::Error),
}

impl EthStreamError {
    /// The disconnect reason the transport should close the session with, if
    /// the error is fatal to the session.
    pub fn as_disconnect_reason(&self) -> Option<DisconnectReason> {
        match self {
            Self::EthHandshakeError(err) => Some(err.as_disconnect_reason()),
            Self::InvalidMessage(_) | Self::MessageTooBig(_) | Self::Snappy(_) => {
                Some(DisconnectReason::SubprotocolSpecific)
            }
            // a peer answering with ids we never issued violates the
            // sub-protocol; local send-side bookkeeping errors do not
            Self::Request(
                RequestError::UnknownRequestId(_) | RequestError::UnexpectedResponseType { .. },
            ) => Some(DisconnectReason::SubprotocolSpecific),
            Self::Request(_) |
            Self::Io(_) |
            Self::ParseVersion(_) |
            Self::MessageNotSupported { .. } => None,
        }
    }
}

impl From<alloy_rlp::Error> for EthStreamError {
    fn from(err: alloy_rlp::Error) -> Self {
        Self::InvalidMessage(err.into())
    }
}

/// Error that can occur during the `eth` sub-protocol handshake, or on a
/// stray STATUS afterwards.
#[derive(Debug, thiserror::Error)]
pub enum EthHandshakeError {
    /// A STATUS message arrived on an established session.
    #[error("uncontrolled status message: status can only be exchanged in the handshake")]
    StatusNotInHandshake,
    /// The first message of the session was not STATUS.
    #[error("received non-status message when trying to handshake")]
    NonStatusMessageInHandshake,
    /// The peer sent nothing before the stream ended.
    #[error("no response received when sending out handshake")]
    NoResponse,
    /// The peer did not send its STATUS within the handshake window.
    #[error("status exchange timed out")]
    StatusTimeout,
    /// The remote's fork id failed EIP-2124 validation.
    #[error(transparent)]
    InvalidFork(#[from] ValidationError),
    /// Genesis hashes differ.
    #[error("mismatched genesis in status message: {0}")]
    MismatchedGenesis(GotExpected<B256>),
    /// Protocol versions differ.
    #[error("mismatched protocol version in status message: {0}")]
    MismatchedProtocolVersion(GotExpected<u8>),
    /// Network ids differ.
    #[error("mismatched chain in status message: {0}")]
    MismatchedChain(GotExpected<u64>),
    /// The advertised total difficulty is implausibly large.
    #[error("total difficulty bitlen is too large: got {got}, maximum {maximum}")]
    TotalDifficultyBitLenTooLarge {
        /// Bit length of the advertised total difficulty.
        got: usize,
        /// The accepted maximum.
        maximum: usize,
    },
}

impl EthHandshakeError {
    /// The disconnect reason matching this handshake failure.
    pub const fn as_disconnect_reason(&self) -> DisconnectReason {
        match self {
            Self::StatusTimeout => DisconnectReason::Timeout,
            Self::MismatchedGenesis(_) |
            Self::MismatchedProtocolVersion(_) |
            Self::MismatchedChain(_) |
            Self::TotalDifficultyBitLenTooLarge { .. } => DisconnectReason::UselessPeer,
            Self::StatusNotInHandshake |
            Self::NonStatusMessageInHandshake |
            Self::NoResponse |
            Self::InvalidFork(_) => DisconnectReason::SubprotocolSpecific,
        }
    }
}

/// Errors of the payload codec.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The message code is not part of the protocol.
    #[error("message id {0:#x} is invalid")]
    InvalidMessageId(u8),
    /// The payload is not well-formed RLP for the declared code.
    #[error(transparent)]
    Rlp(#[from] alloy_rlp::Error),
}

/// Errors of request id correlation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The message is not a request and cannot allocate an id.
    #[error("{0:?} is not a request message")]
    NotARequest(EthMessageID),
    /// The id is still in flight and cannot be reused yet.
    #[error("request id {0} is already in flight")]
    DuplicateRequestId(u64),
    /// The message is not a response and cannot settle an id.
    #[error("{0:?} is not a response message")]
    NotAResponse(EthMessageID),
    /// A response arrived with an id that is not outstanding.
    #[error("response with unknown request id {0}")]
    UnknownRequestId(u64),
    /// A response arrived with the wrong code for its id.
    #[error("response for request id {request_id} has unexpected type: {types}")]
    UnexpectedResponseType {
        /// The echoed request id.
        request_id: u64,
        /// Observed and expected response codes.
        types: GotExpected<EthMessageID>,
    },
}
