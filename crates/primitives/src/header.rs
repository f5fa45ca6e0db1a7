use crate::{
    basefee::calc_next_block_base_fee, constants::EMPTY_OMMER_ROOT, BaseFeeParams, BlockNumber,
};
use alloy_primitives::{keccak256, Address, Bloom, Bytes, B256, U256};
use alloy_rlp::{length_of_length, Decodable, Encodable};
use bytes::BufMut;
use std::ops::Deref;

/// An Ethereum block header.
///
/// The `base_fee_per_gas` field is only present on blocks at or after the
/// London hardfork and participates in the RLP encoding only when set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Hash of the uncle headers list.
    pub ommers_hash: B256,
    /// Address that receives the block rewards and fees. Under Clique this
    /// doubles as the vote target and the signer is carried in the seal.
    pub beneficiary: Address,
    /// State trie root after executing this block.
    pub state_root: B256,
    /// Root of the trie of this block's transactions.
    pub transactions_root: B256,
    /// Root of the trie of this block's receipts.
    pub receipts_root: B256,
    /// Bloom filter over the logs of this block.
    pub logs_bloom: Bloom,
    /// Block difficulty. Clique uses 2 for in-turn and 1 for out-of-turn
    /// blocks.
    pub difficulty: U256,
    /// Block number.
    pub number: BlockNumber,
    /// Gas limit of this block.
    pub gas_limit: u64,
    /// Total gas used by all transactions in this block.
    pub gas_used: u64,
    /// Unix timestamp of the block, in seconds.
    pub timestamp: u64,
    /// Arbitrary extra data. Clique stores 32 bytes of vanity followed by the
    /// 65-byte seal signature here.
    pub extra_data: Bytes,
    /// Mix hash (unused on proof-of-authority chains).
    pub mix_hash: B256,
    /// Proof-of-work nonce, encoded as an 8-byte string.
    pub nonce: u64,
    /// EIP-1559 base fee, present from the London hardfork on.
    pub base_fee_per_gas: Option<u64>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: B256::ZERO,
            ommers_hash: EMPTY_OMMER_ROOT,
            beneficiary: Address::ZERO,
            state_root: B256::ZERO,
            transactions_root: B256::ZERO,
            receipts_root: B256::ZERO,
            logs_bloom: Bloom::ZERO,
            difficulty: U256::ZERO,
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_hash: B256::ZERO,
            nonce: 0,
            base_fee_per_gas: None,
        }
    }
}

impl Header {
    /// Computes the keccak hash of the RLP encoded header.
    ///
    /// This is a full re-encode on every call; use [`SealedHeader`] to cache
    /// the result.
    pub fn hash_slow(&self) -> B256 {
        let mut out = Vec::with_capacity(self.length());
        self.encode(&mut out);
        keccak256(&out)
    }

    /// Seals the header with its hash.
    pub fn seal_slow(self) -> SealedHeader {
        let hash = self.hash_slow();
        self.seal(hash)
    }

    /// Seals the header with the given, already computed, hash.
    pub fn seal(self, hash: B256) -> SealedHeader {
        SealedHeader { header: self, hash }
    }

    /// Returns the base fee the next block must use, per the EIP-1559 update
    /// rule, or `None` if this header carries no base fee.
    pub fn next_block_base_fee(&self, params: BaseFeeParams) -> Option<u64> {
        let base_fee = self.base_fee_per_gas?;
        Some(calc_next_block_base_fee(self.gas_used, self.gas_limit, base_fee, params))
    }

    fn header_payload_length(&self) -> usize {
        let mut length = 0;
        length += self.parent_hash.length();
        length += self.ommers_hash.length();
        length += self.beneficiary.length();
        length += self.state_root.length();
        length += self.transactions_root.length();
        length += self.receipts_root.length();
        length += self.logs_bloom.length();
        length += self.difficulty.length();
        length += self.number.length();
        length += self.gas_limit.length();
        length += self.gas_used.length();
        length += self.timestamp.length();
        length += self.extra_data.length();
        length += self.mix_hash.length();
        length += self.nonce.to_be_bytes().length();
        if let Some(base_fee) = self.base_fee_per_gas {
            length += base_fee.length();
        }
        length
    }
}

impl Encodable for Header {
    fn encode(&self, out: &mut dyn BufMut) {
        let list_header =
            alloy_rlp::Header { list: true, payload_length: self.header_payload_length() };
        list_header.encode(out);
        self.parent_hash.encode(out);
        self.ommers_hash.encode(out);
        self.beneficiary.encode(out);
        self.state_root.encode(out);
        self.transactions_root.encode(out);
        self.receipts_root.encode(out);
        self.logs_bloom.encode(out);
        self.difficulty.encode(out);
        self.number.encode(out);
        self.gas_limit.encode(out);
        self.gas_used.encode(out);
        self.timestamp.encode(out);
        self.extra_data.encode(out);
        self.mix_hash.encode(out);
        // the nonce is an 8-byte string on the wire, not an integer
        self.nonce.to_be_bytes().encode(out);
        if let Some(base_fee) = self.base_fee_per_gas {
            base_fee.encode(out);
        }
    }

    fn length(&self) -> usize {
        let payload_length = self.header_payload_length();
        payload_length + length_of_length(payload_length)
    }
}

impl Decodable for Header {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let rlp_head = alloy_rlp::Header::decode(buf)?;
        if !rlp_head.list {
            return Err(alloy_rlp::Error::UnexpectedString)
        }
        let started_len = buf.len();
        let mut this = Self {
            parent_hash: Decodable::decode(buf)?,
            ommers_hash: Decodable::decode(buf)?,
            beneficiary: Decodable::decode(buf)?,
            state_root: Decodable::decode(buf)?,
            transactions_root: Decodable::decode(buf)?,
            receipts_root: Decodable::decode(buf)?,
            logs_bloom: Decodable::decode(buf)?,
            difficulty: Decodable::decode(buf)?,
            number: u64::decode(buf)?,
            gas_limit: u64::decode(buf)?,
            gas_used: u64::decode(buf)?,
            timestamp: u64::decode(buf)?,
            extra_data: Decodable::decode(buf)?,
            mix_hash: Decodable::decode(buf)?,
            nonce: u64::from_be_bytes(<[u8; 8]>::decode(buf)?),
            base_fee_per_gas: None,
        };

        // a base fee is present iff the list has a 16th element
        if started_len - buf.len() < rlp_head.payload_length {
            this.base_fee_per_gas = Some(u64::decode(buf)?);
        }

        let consumed = started_len - buf.len();
        if consumed != rlp_head.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: rlp_head.payload_length,
                got: consumed,
            })
        }
        Ok(this)
    }
}

/// A [`Header`] together with its memoized hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SealedHeader {
    /// The sealed header.
    header: Header,
    /// The cached keccak hash of the header.
    hash: B256,
}

impl SealedHeader {
    /// Returns the block hash.
    pub const fn hash(&self) -> B256 {
        self.hash
    }

    /// Returns a reference to the inner header.
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Consumes the seal and returns the bare header.
    pub fn unseal(self) -> Header {
        self.header
    }

    /// Splits the seal into the header and its hash.
    pub fn split(self) -> (Header, B256) {
        (self.header, self.hash)
    }
}

impl Deref for SealedHeader {
    type Target = Header;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

impl Default for SealedHeader {
    fn default() -> Self {
        Header::default().seal_slow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::hex;

    #[test]
    fn header_rlp_roundtrip() {
        let header = Header {
            parent_hash: B256::repeat_byte(0x11),
            beneficiary: Address::repeat_byte(0x22),
            difficulty: U256::from(2u64),
            number: 100,
            gas_limit: 8_000_000,
            gas_used: 21_000,
            timestamp: 1_600_000_000,
            extra_data: Bytes::from_static(&[0xde, 0xad]),
            nonce: 42,
            ..Default::default()
        };

        let mut encoded = Vec::new();
        header.encode(&mut encoded);
        assert_eq!(encoded.len(), header.length());

        let decoded = Header::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_rlp_roundtrip_with_base_fee() {
        let header = Header {
            number: 3,
            gas_limit: 30_000_000,
            base_fee_per_gas: Some(crate::constants::EIP1559_INITIAL_BASE_FEE),
            ..Default::default()
        };

        let mut encoded = Vec::new();
        header.encode(&mut encoded);
        let decoded = Header::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded.base_fee_per_gas, header.base_fee_per_gas);
        assert_eq!(decoded, header);
    }

    #[test]
    fn truncated_header_rejected() {
        let header = Header::default();
        let mut encoded = Vec::new();
        header.encode(&mut encoded);
        encoded.truncate(encoded.len() - 1);
        assert!(Header::decode(&mut encoded.as_slice()).is_err());
    }

    #[test]
    fn empty_ommers_hash_matches_known_value() {
        // keccak256(rlp([]))
        assert_eq!(
            EMPTY_OMMER_ROOT,
            keccak256(hex!("c0")),
        );
    }
}
