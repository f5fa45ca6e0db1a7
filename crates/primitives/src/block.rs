use crate::{Header, SealedHeader, TransactionSigned};
use alloy_primitives::B256;
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};
use bytes::BufMut;
use std::{fmt, ops::Deref};

/// An Ethereum block: header, transactions and ommers.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// The transactions executed in this block.
    pub body: Vec<TransactionSigned>,
    /// Headers of this block's ommers.
    pub ommers: Vec<Header>,
}

impl Block {
    /// Seals the block, memoizing the header hash.
    pub fn seal_slow(self) -> SealedBlock {
        SealedBlock {
            header: self.header.seal_slow(),
            body: self.body,
            ommers: self.ommers,
        }
    }
}

/// The transactions and ommers of a block, as served in response to a body
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct BlockBody {
    /// The transactions in the block.
    pub transactions: Vec<TransactionSigned>,
    /// Headers of the block's ommers.
    pub ommers: Vec<Header>,
}

/// A block with a sealed header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SealedBlock {
    /// The sealed header.
    pub header: SealedHeader,
    /// The transactions executed in this block.
    pub body: Vec<TransactionSigned>,
    /// Headers of this block's ommers.
    pub ommers: Vec<Header>,
}

impl SealedBlock {
    /// The memoized block hash.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// The block number.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Unseals the block again.
    pub fn unseal(self) -> Block {
        Block { header: self.header.unseal(), body: self.body, ommers: self.ommers }
    }
}

impl Deref for SealedBlock {
    type Target = SealedHeader;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

/// Either a block hash or a block number, as used to anchor a header request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockHashOrNumber {
    /// A 32-byte block hash.
    Hash(B256),
    /// A block number.
    Number(u64),
}

impl From<B256> for BlockHashOrNumber {
    fn from(hash: B256) -> Self {
        Self::Hash(hash)
    }
}

impl From<u64> for BlockHashOrNumber {
    fn from(number: u64) -> Self {
        Self::Number(number)
    }
}

impl fmt::Display for BlockHashOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash(hash) => write!(f, "{hash}"),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl Encodable for BlockHashOrNumber {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            Self::Hash(hash) => hash.encode(out),
            Self::Number(number) => number.encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            Self::Hash(hash) => hash.length(),
            Self::Number(number) => number.length(),
        }
    }
}

impl Decodable for BlockHashOrNumber {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        // a hash is always a 32-byte string, i.e. prefix 0x80 + 32
        if first == 0xa0 {
            Ok(Self::Hash(B256::decode(buf)?))
        } else {
            Ok(Self::Number(u64::decode(buf)?))
        }
    }
}
