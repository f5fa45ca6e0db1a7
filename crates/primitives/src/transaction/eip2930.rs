use crate::transaction::AccessList;
use alloy_primitives::{keccak256, Bytes, TxKind, B256, U256};
use alloy_rlp::{Decodable, Encodable};
use bytes::BufMut;

/// An [EIP-2930](https://eips.ethereum.org/EIPS/eip-2930) access list (type 1)
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TxEip2930 {
    /// Chain this transaction is valid on.
    pub chain_id: u64,
    /// Sequence number of transactions sent by the sender.
    pub nonce: u64,
    /// Price, in wei, the sender pays per unit of gas.
    pub gas_price: u128,
    /// Maximum gas the transaction may consume.
    pub gas_limit: u64,
    /// Recipient, or create.
    pub to: TxKind,
    /// Wei transferred to the recipient.
    pub value: U256,
    /// Storage the transaction plans to access.
    pub access_list: AccessList,
    /// Call data, or init code for a create.
    pub input: Bytes,
}

impl TxEip2930 {
    pub(crate) fn fields_len(&self) -> usize {
        self.chain_id.length() +
            self.nonce.length() +
            self.gas_price.length() +
            self.gas_limit.length() +
            self.to.length() +
            self.value.length() +
            self.input.length() +
            self.access_list.length()
    }

    pub(crate) fn encode_fields(&self, out: &mut dyn BufMut) {
        self.chain_id.encode(out);
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.input.encode(out);
        self.access_list.encode(out);
    }

    pub(crate) fn decode_fields(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Ok(Self {
            chain_id: Decodable::decode(buf)?,
            nonce: Decodable::decode(buf)?,
            gas_price: Decodable::decode(buf)?,
            gas_limit: Decodable::decode(buf)?,
            to: Decodable::decode(buf)?,
            value: Decodable::decode(buf)?,
            input: Decodable::decode(buf)?,
            access_list: Decodable::decode(buf)?,
        })
    }

    /// The hash a signer commits to: `keccak256(0x01 || rlp(fields))`.
    pub fn signature_hash(&self) -> B256 {
        let payload_length = self.fields_len();
        let mut buf = Vec::with_capacity(payload_length + 4);
        buf.push(1u8);
        alloy_rlp::Header { list: true, payload_length }.encode(&mut buf);
        self.encode_fields(&mut buf);
        keccak256(&buf)
    }
}
