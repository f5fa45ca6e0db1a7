//! The message registry of the `eth` protocol: the code table, the typed
//! payload for every code, and the version-aware envelope codec.
//!
//! Each protocol version speaks a subset of the codes and, from `eth/66` on,
//! wraps request/response payloads in a [`RequestPair`]; the decoder picks
//! both by the negotiated version rather than by subtyping.

use crate::{
    errors::MessageError, types::*, EthVersion, StatusMessage,
};
use alloy_rlp::{length_of_length, Decodable, Encodable};
use bytes::{Buf, BufMut};
use std::fmt;

/// Represents message IDs for `eth` protocol messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EthMessageID {
    /// The STATUS handshake message.
    Status = 0x00,
    /// Announcement of new block hashes.
    NewBlockHashes = 0x01,
    /// Broadcast of new transactions.
    Transactions = 0x02,
    /// A block header request.
    GetBlockHeaders = 0x03,
    /// A block header response.
    BlockHeaders = 0x04,
    /// A block body request.
    GetBlockBodies = 0x05,
    /// A block body response.
    BlockBodies = 0x06,
    /// Broadcast of a new block.
    NewBlock = 0x07,
    /// Announcement of pooled transaction hashes.
    NewPooledTransactionHashes = 0x08,
    /// A pooled transaction request.
    GetPooledTransactions = 0x09,
    /// A pooled transaction response.
    PooledTransactions = 0x0a,
    /// A state trie node request.
    GetNodeData = 0x0d,
    /// A state trie node response.
    NodeData = 0x0e,
    /// A receipts request.
    GetReceipts = 0x0f,
    /// A receipts response.
    Receipts = 0x10,
}

impl EthMessageID {
    /// A short diagnostic name of the message.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::NewBlockHashes => "NewBlockHashes",
            Self::Transactions => "Transactions",
            Self::GetBlockHeaders => "GetBlockHeaders",
            Self::BlockHeaders => "BlockHeaders",
            Self::GetBlockBodies => "GetBlockBodies",
            Self::BlockBodies => "BlockBodies",
            Self::NewBlock => "NewBlock",
            Self::NewPooledTransactionHashes => "NewPooledTransactionHashes",
            Self::GetPooledTransactions => "GetPooledTransactions",
            Self::PooledTransactions => "PooledTransactions",
            Self::GetNodeData => "GetNodeData",
            Self::NodeData => "NodeData",
            Self::GetReceipts => "GetReceipts",
            Self::Receipts => "Receipts",
        }
    }

    /// The lowest protocol version that speaks this message.
    pub const fn min_version(&self) -> EthVersion {
        match self {
            Self::Status |
            Self::NewBlockHashes |
            Self::Transactions |
            Self::GetBlockHeaders |
            Self::BlockHeaders |
            Self::GetBlockBodies |
            Self::BlockBodies |
            Self::NewBlock => EthVersion::Eth62,
            Self::GetNodeData | Self::NodeData | Self::GetReceipts | Self::Receipts => {
                EthVersion::Eth63
            }
            Self::NewPooledTransactionHashes |
            Self::GetPooledTransactions |
            Self::PooledTransactions => EthVersion::Eth65,
        }
    }

    /// Whether the negotiated version speaks this message.
    pub fn supported_by(&self, version: EthVersion) -> bool {
        version >= self.min_version()
    }

    /// The response code of a request message.
    pub const fn response(&self) -> Option<Self> {
        match self {
            Self::GetBlockHeaders => Some(Self::BlockHeaders),
            Self::GetBlockBodies => Some(Self::BlockBodies),
            Self::GetPooledTransactions => Some(Self::PooledTransactions),
            Self::GetNodeData => Some(Self::NodeData),
            Self::GetReceipts => Some(Self::Receipts),
            _ => None,
        }
    }

    /// Whether this message is a request expecting a response.
    pub const fn is_request(&self) -> bool {
        self.response().is_some()
    }

    /// Whether this message is the response half of a request/response pair.
    pub const fn is_response(&self) -> bool {
        matches!(
            self,
            Self::BlockHeaders |
                Self::BlockBodies |
                Self::PooledTransactions |
                Self::NodeData |
                Self::Receipts
        )
    }
}

impl fmt::Display for EthMessageID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Encodable for EthMessageID {
    fn encode(&self, out: &mut dyn BufMut) {
        out.put_u8(*self as u8);
    }

    fn length(&self) -> usize {
        1
    }
}

impl Decodable for EthMessageID {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let id = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        let id = Self::try_from(id).map_err(|_| alloy_rlp::Error::Custom("invalid message id"))?;
        buf.advance(1);
        Ok(id)
    }
}

impl TryFrom<u8> for EthMessageID {
    type Error = MessageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Status),
            0x01 => Ok(Self::NewBlockHashes),
            0x02 => Ok(Self::Transactions),
            0x03 => Ok(Self::GetBlockHeaders),
            0x04 => Ok(Self::BlockHeaders),
            0x05 => Ok(Self::GetBlockBodies),
            0x06 => Ok(Self::BlockBodies),
            0x07 => Ok(Self::NewBlock),
            0x08 => Ok(Self::NewPooledTransactionHashes),
            0x09 => Ok(Self::GetPooledTransactions),
            0x0a => Ok(Self::PooledTransactions),
            0x0d => Ok(Self::GetNodeData),
            0x0e => Ok(Self::NodeData),
            0x0f => Ok(Self::GetReceipts),
            0x10 => Ok(Self::Receipts),
            _ => Err(MessageError::InvalidMessageId(value)),
        }
    }
}

/// An `eth` protocol message with its typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EthMessage {
    /// The STATUS handshake message.
    Status(StatusMessage),
    /// Announcement of new block hashes.
    NewBlockHashes(NewBlockHashes),
    /// Broadcast of new transactions.
    Transactions(Transactions),
    /// A block header request.
    GetBlockHeaders(RequestPair<GetBlockHeaders>),
    /// A block header response.
    BlockHeaders(RequestPair<BlockHeaders>),
    /// A block body request.
    GetBlockBodies(RequestPair<GetBlockBodies>),
    /// A block body response.
    BlockBodies(RequestPair<BlockBodies>),
    /// Broadcast of a new block.
    NewBlock(Box<NewBlock>),
    /// Announcement of pooled transaction hashes.
    NewPooledTransactionHashes(NewPooledTransactionHashes),
    /// A pooled transaction request.
    GetPooledTransactions(RequestPair<GetPooledTransactions>),
    /// A pooled transaction response.
    PooledTransactions(RequestPair<PooledTransactions>),
    /// A state trie node request.
    GetNodeData(RequestPair<GetNodeData>),
    /// A state trie node response.
    NodeData(RequestPair<NodeData>),
    /// A receipts request.
    GetReceipts(RequestPair<GetReceipts>),
    /// A receipts response.
    Receipts(RequestPair<Receipts>),
}

impl EthMessage {
    /// The message's code.
    pub const fn message_id(&self) -> EthMessageID {
        match self {
            Self::Status(_) => EthMessageID::Status,
            Self::NewBlockHashes(_) => EthMessageID::NewBlockHashes,
            Self::Transactions(_) => EthMessageID::Transactions,
            Self::GetBlockHeaders(_) => EthMessageID::GetBlockHeaders,
            Self::BlockHeaders(_) => EthMessageID::BlockHeaders,
            Self::GetBlockBodies(_) => EthMessageID::GetBlockBodies,
            Self::BlockBodies(_) => EthMessageID::BlockBodies,
            Self::NewBlock(_) => EthMessageID::NewBlock,
            Self::NewPooledTransactionHashes(_) => EthMessageID::NewPooledTransactionHashes,
            Self::GetPooledTransactions(_) => EthMessageID::GetPooledTransactions,
            Self::PooledTransactions(_) => EthMessageID::PooledTransactions,
            Self::GetNodeData(_) => EthMessageID::GetNodeData,
            Self::NodeData(_) => EthMessageID::NodeData,
            Self::GetReceipts(_) => EthMessageID::GetReceipts,
            Self::Receipts(_) => EthMessageID::Receipts,
        }
    }

    /// The request id carried by the message, if it is half of a
    /// request/response pair.
    pub const fn request_id(&self) -> Option<u64> {
        match self {
            Self::GetBlockHeaders(pair) => Some(pair.request_id),
            Self::BlockHeaders(pair) => Some(pair.request_id),
            Self::GetBlockBodies(pair) => Some(pair.request_id),
            Self::BlockBodies(pair) => Some(pair.request_id),
            Self::GetPooledTransactions(pair) => Some(pair.request_id),
            Self::PooledTransactions(pair) => Some(pair.request_id),
            Self::GetNodeData(pair) => Some(pair.request_id),
            Self::NodeData(pair) => Some(pair.request_id),
            Self::GetReceipts(pair) => Some(pair.request_id),
            Self::Receipts(pair) => Some(pair.request_id),
            _ => None,
        }
    }

    fn encode_payload(&self, version: EthVersion, out: &mut dyn BufMut) {
        match self {
            Self::Status(status) => status.encode(out),
            Self::NewBlockHashes(message) => message.encode(out),
            Self::Transactions(message) => message.encode(out),
            Self::NewBlock(message) => message.encode(out),
            Self::NewPooledTransactionHashes(message) => message.encode(out),
            Self::GetBlockHeaders(pair) => pair.encode_for_version(version, out),
            Self::BlockHeaders(pair) => pair.encode_for_version(version, out),
            Self::GetBlockBodies(pair) => pair.encode_for_version(version, out),
            Self::BlockBodies(pair) => pair.encode_for_version(version, out),
            Self::GetPooledTransactions(pair) => pair.encode_for_version(version, out),
            Self::PooledTransactions(pair) => pair.encode_for_version(version, out),
            Self::GetNodeData(pair) => pair.encode_for_version(version, out),
            Self::NodeData(pair) => pair.encode_for_version(version, out),
            Self::GetReceipts(pair) => pair.encode_for_version(version, out),
            Self::Receipts(pair) => pair.encode_for_version(version, out),
        }
    }

    fn payload_length(&self, version: EthVersion) -> usize {
        match self {
            Self::Status(status) => status.length(),
            Self::NewBlockHashes(message) => message.length(),
            Self::Transactions(message) => message.length(),
            Self::NewBlock(message) => message.length(),
            Self::NewPooledTransactionHashes(message) => message.length(),
            Self::GetBlockHeaders(pair) => pair.length_for_version(version),
            Self::BlockHeaders(pair) => pair.length_for_version(version),
            Self::GetBlockBodies(pair) => pair.length_for_version(version),
            Self::BlockBodies(pair) => pair.length_for_version(version),
            Self::GetPooledTransactions(pair) => pair.length_for_version(version),
            Self::PooledTransactions(pair) => pair.length_for_version(version),
            Self::GetNodeData(pair) => pair.length_for_version(version),
            Self::NodeData(pair) => pair.length_for_version(version),
            Self::GetReceipts(pair) => pair.length_for_version(version),
            Self::Receipts(pair) => pair.length_for_version(version),
        }
    }
}

/// An `eth` message code together with its payload, as it travels on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMessage {
    /// The message code.
    pub message_type: EthMessageID,
    /// The typed payload.
    pub message: EthMessage,
}

impl ProtocolMessage {
    /// Encodes the message for the negotiated version: the code byte followed
    /// by the payload, with request ids included only from `eth/66` on.
    pub fn encode_for_version(&self, version: EthVersion, out: &mut dyn BufMut) {
        self.message_type.encode(out);
        self.message.encode_payload(version, out);
    }

    /// The encoded length under the negotiated version.
    pub fn length_for_version(&self, version: EthVersion) -> usize {
        self.message_type.length() + self.message.payload_length(version)
    }

    /// Decodes a message from the code byte onwards, interpreting the
    /// payload per the negotiated version.
    ///
    /// Decoding does not enforce the version whitelist; the session layer
    /// decides whether an out-of-version message is dropped or fatal.
    pub fn decode_message(version: EthVersion, buf: &mut &[u8]) -> Result<Self, MessageError> {
        let id = *buf.first().ok_or(MessageError::Rlp(alloy_rlp::Error::InputTooShort))?;
        let message_type = EthMessageID::try_from(id)?;
        buf.advance(1);

        let message = match message_type {
            EthMessageID::Status => {
                EthMessage::Status(StatusMessage::decode_for_version(version, buf)?)
            }
            EthMessageID::NewBlockHashes => {
                EthMessage::NewBlockHashes(NewBlockHashes::decode(buf)?)
            }
            EthMessageID::Transactions => EthMessage::Transactions(Transactions::decode(buf)?),
            EthMessageID::NewBlock => EthMessage::NewBlock(Box::new(NewBlock::decode(buf)?)),
            EthMessageID::GetBlockHeaders => {
                EthMessage::GetBlockHeaders(RequestPair::decode_for_version(version, buf)?)
            }
            EthMessageID::BlockHeaders => {
                EthMessage::BlockHeaders(RequestPair::decode_for_version(version, buf)?)
            }
            EthMessageID::GetBlockBodies => {
                EthMessage::GetBlockBodies(RequestPair::decode_for_version(version, buf)?)
            }
            EthMessageID::BlockBodies => {
                EthMessage::BlockBodies(RequestPair::decode_for_version(version, buf)?)
            }
            EthMessageID::NewPooledTransactionHashes => EthMessage::NewPooledTransactionHashes(
                NewPooledTransactionHashes::decode(buf)?,
            ),
            EthMessageID::GetPooledTransactions => {
                EthMessage::GetPooledTransactions(RequestPair::decode_for_version(version, buf)?)
            }
            EthMessageID::PooledTransactions => {
                EthMessage::PooledTransactions(RequestPair::decode_for_version(version, buf)?)
            }
            EthMessageID::GetNodeData => {
                EthMessage::GetNodeData(RequestPair::decode_for_version(version, buf)?)
            }
            EthMessageID::NodeData => {
                EthMessage::NodeData(RequestPair::decode_for_version(version, buf)?)
            }
            EthMessageID::GetReceipts => {
                EthMessage::GetReceipts(RequestPair::decode_for_version(version, buf)?)
            }
            EthMessageID::Receipts => {
                EthMessage::Receipts(RequestPair::decode_for_version(version, buf)?)
            }
        };

        // a frame carries exactly one message
        if !buf.is_empty() {
            return Err(MessageError::Rlp(alloy_rlp::Error::UnexpectedLength))
        }

        Ok(Self { message_type, message })
    }
}

impl From<EthMessage> for ProtocolMessage {
    fn from(message: EthMessage) -> Self {
        Self { message_type: message.message_id(), message }
    }
}

/// A pair of a request id and a payload, the envelope of every
/// request/response message from `eth/66` on. Legacy versions put the bare
/// payload on the wire; the id then defaults to 0 and stays local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestPair<T> {
    /// The id correlating a response to its request.
    pub request_id: u64,
    /// The request or response payload.
    pub message: T,
}

impl<T: Encodable> RequestPair<T> {
    fn pair_payload_length(&self) -> usize {
        self.request_id.length() + self.message.length()
    }

    /// Encodes `[request_id, payload]` for `eth/66`, the bare payload for
    /// older versions.
    pub fn encode_for_version(&self, version: EthVersion, out: &mut dyn BufMut) {
        if version.has_request_ids() {
            alloy_rlp::Header { list: true, payload_length: self.pair_payload_length() }
                .encode(out);
            self.request_id.encode(out);
            self.message.encode(out);
        } else {
            self.message.encode(out);
        }
    }

    /// The encoded length under the negotiated version.
    pub fn length_for_version(&self, version: EthVersion) -> usize {
        if version.has_request_ids() {
            let payload_length = self.pair_payload_length();
            payload_length + length_of_length(payload_length)
        } else {
            self.message.length()
        }
    }
}

impl<T: Decodable> RequestPair<T> {
    /// Decodes `[request_id, payload]` for `eth/66`, the bare payload (with a
    /// zero id) for older versions.
    pub fn decode_for_version(version: EthVersion, buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        if !version.has_request_ids() {
            return Ok(Self { request_id: 0, message: T::decode(buf)? })
        }

        let header = alloy_rlp::Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString)
        }
        let remaining = buf.len();

        let request_id = u64::decode(buf)?;
        let message = T::decode(buf)?;

        if remaining - buf.len() != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: remaining - buf.len(),
            })
        }

        Ok(Self { request_id, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{hex, B256};
    use ember_primitives::BlockHashOrNumber;

    fn headers_request(request_id: u64) -> EthMessage {
        EthMessage::GetBlockHeaders(RequestPair {
            request_id,
            message: GetBlockHeaders {
                start_block: BlockHashOrNumber::Number(10),
                limit: 5,
                skip: 0,
                direction: HeadersDirection::Falling,
            },
        })
    }

    #[test]
    fn eth66_request_carries_request_id() {
        let message = ProtocolMessage::from(headers_request(1111));
        let mut encoded = Vec::new();
        message.encode_for_version(EthVersion::Eth66, &mut encoded);
        assert_eq!(encoded.len(), message.length_for_version(EthVersion::Eth66));
        // 0x03 code, then [ 1111, [ 10, 5, 0, reverse ] ]
        assert_eq!(encoded, hex!("03c8820457c40a058001"));

        let decoded =
            ProtocolMessage::decode_message(EthVersion::Eth66, &mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn legacy_request_omits_request_id() {
        let message = ProtocolMessage::from(headers_request(0));
        let mut encoded = Vec::new();
        message.encode_for_version(EthVersion::Eth65, &mut encoded);
        assert_eq!(encoded.len(), message.length_for_version(EthVersion::Eth65));
        // 0x03 code, then the bare [ 10, 5, 0, reverse ]
        assert_eq!(encoded, hex!("03c40a058001"));

        let decoded =
            ProtocolMessage::decode_message(EthVersion::Eth65, &mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn request_id_roundtrips_for_responses() {
        let message = EthMessage::BlockBodies(RequestPair {
            request_id: u64::MAX,
            message: BlockBodies(vec![]),
        });
        let protocol = ProtocolMessage::from(message);

        let mut encoded = Vec::new();
        protocol.encode_for_version(EthVersion::Eth66, &mut encoded);
        let decoded =
            ProtocolMessage::decode_message(EthVersion::Eth66, &mut encoded.as_slice()).unwrap();
        assert_eq!(decoded.message.request_id(), Some(u64::MAX));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let message = ProtocolMessage::from(headers_request(1));
        let mut encoded = Vec::new();
        message.encode_for_version(EthVersion::Eth66, &mut encoded);
        encoded.push(0x00);
        assert!(
            ProtocolMessage::decode_message(EthVersion::Eth66, &mut encoded.as_slice()).is_err()
        );
    }

    #[test]
    fn unknown_message_id_rejected() {
        // 0x0b and 0x0c are holes in the code table
        for id in [0x0bu8, 0x0c, 0x11, 0x7f] {
            let encoded = [id, 0xc0];
            assert!(matches!(
                ProtocolMessage::decode_message(EthVersion::Eth66, &mut &encoded[..]),
                Err(MessageError::InvalidMessageId(got)) if got == id
            ));
        }
    }

    #[test]
    fn message_version_table() {
        use EthMessageID::*;
        for id in [NewBlockHashes, Transactions, GetBlockHeaders, BlockHeaders, NewBlock] {
            assert_eq!(id.min_version(), EthVersion::Eth62);
        }
        for id in [GetNodeData, NodeData, GetReceipts, Receipts] {
            assert_eq!(id.min_version(), EthVersion::Eth63);
        }
        for id in [NewPooledTransactionHashes, GetPooledTransactions, PooledTransactions] {
            assert_eq!(id.min_version(), EthVersion::Eth65);
        }
    }

    #[test]
    fn response_table() {
        assert_eq!(EthMessageID::GetBlockHeaders.response(), Some(EthMessageID::BlockHeaders));
        assert_eq!(EthMessageID::GetReceipts.response(), Some(EthMessageID::Receipts));
        assert_eq!(EthMessageID::NewBlock.response(), None);
        assert!(EthMessageID::GetPooledTransactions.is_request());
        assert!(EthMessageID::PooledTransactions.is_response());
    }

    #[test]
    fn get_pooled_transactions_roundtrip() {
        let message = EthMessage::GetPooledTransactions(RequestPair {
            request_id: 7,
            message: GetPooledTransactions(vec![B256::repeat_byte(0xaa)]),
        });
        let protocol = ProtocolMessage::from(message);

        let mut encoded = Vec::new();
        protocol.encode_for_version(EthVersion::Eth66, &mut encoded);
        let decoded =
            ProtocolMessage::decode_message(EthVersion::Eth66, &mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, protocol);
    }
}
