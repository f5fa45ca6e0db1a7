use alloy_primitives::{keccak256, Bytes, TxKind, B256, U256};
use alloy_rlp::{Decodable, Encodable};
use bytes::BufMut;

/// A legacy (type 0) transaction, optionally replay protected per EIP-155.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TxLegacy {
    /// The chain id folded into `v`, if the transaction is EIP-155 protected.
    pub chain_id: Option<u64>,
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
    /// Call data, or init code for a create.
    pub input: Bytes,
}

impl TxLegacy {
    pub(crate) fn fields_len(&self) -> usize {
        self.nonce.length() +
            self.gas_price.length() +
            self.gas_limit.length() +
            self.to.length() +
            self.value.length() +
            self.input.length()
    }

    pub(crate) fn encode_fields(&self, out: &mut dyn BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.input.encode(out);
    }

    pub(crate) fn decode_fields(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        Ok(Self {
            chain_id: None,
            nonce: Decodable::decode(buf)?,
            gas_price: Decodable::decode(buf)?,
            gas_limit: Decodable::decode(buf)?,
            to: Decodable::decode(buf)?,
            value: Decodable::decode(buf)?,
            input: Decodable::decode(buf)?,
        })
    }

    /// The hash a signer commits to: the RLP of the fields, with the chain id
    /// and two empty items appended when EIP-155 applies.
    pub fn signature_hash(&self) -> B256 {
        let mut payload_length = self.fields_len();
        if let Some(chain_id) = self.chain_id {
            payload_length += chain_id.length() + 2;
        }

        let mut buf = Vec::with_capacity(payload_length + 3);
        alloy_rlp::Header { list: true, payload_length }.encode(&mut buf);
        self.encode_fields(&mut buf);
        if let Some(chain_id) = self.chain_id {
            chain_id.encode(&mut buf);
            0u8.encode(&mut buf);
            0u8.encode(&mut buf);
        }
        keccak256(&buf)
    }
}
