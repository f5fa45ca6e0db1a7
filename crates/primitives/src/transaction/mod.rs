//! Transaction types and their wire encodings.

use alloy_primitives::{keccak256, Address, Bytes, TxHash, TxKind, B256, U256};
use alloy_rlp::{length_of_length, Decodable, Encodable, EMPTY_LIST_CODE};
use bytes::BufMut;
use std::ops::Deref;

mod access_list;
mod eip1559;
mod eip2930;
mod legacy;
mod signature;
mod tx_type;
pub mod util;

pub use access_list::{AccessList, AccessListItem};
pub use eip1559::TxEip1559;
pub use eip2930::TxEip2930;
pub use legacy::TxLegacy;
pub use signature::Signature;
pub use tx_type::TxType;

/// An unsigned transaction of any supported type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transaction {
    /// Legacy transaction (type 0).
    Legacy(TxLegacy),
    /// EIP-2930 access list transaction (type 1).
    Eip2930(TxEip2930),
    /// EIP-1559 dynamic fee transaction (type 2).
    Eip1559(TxEip1559),
}

impl Transaction {
    /// The EIP-2718 type of this transaction.
    pub const fn tx_type(&self) -> TxType {
        match self {
            Self::Legacy(_) => TxType::Legacy,
            Self::Eip2930(_) => TxType::Eip2930,
            Self::Eip1559(_) => TxType::Eip1559,
        }
    }

    /// The chain id, if the transaction carries one.
    pub const fn chain_id(&self) -> Option<u64> {
        match self {
            Self::Legacy(tx) => tx.chain_id,
            Self::Eip2930(tx) => Some(tx.chain_id),
            Self::Eip1559(tx) => Some(tx.chain_id),
        }
    }

    /// The sender's nonce.
    pub const fn nonce(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.nonce,
            Self::Eip2930(tx) => tx.nonce,
            Self::Eip1559(tx) => tx.nonce,
        }
    }

    /// The gas limit of the transaction.
    pub const fn gas_limit(&self) -> u64 {
        match self {
            Self::Legacy(tx) => tx.gas_limit,
            Self::Eip2930(tx) => tx.gas_limit,
            Self::Eip1559(tx) => tx.gas_limit,
        }
    }

    /// The recipient, or create.
    pub const fn to(&self) -> TxKind {
        match self {
            Self::Legacy(tx) => tx.to,
            Self::Eip2930(tx) => tx.to,
            Self::Eip1559(tx) => tx.to,
        }
    }

    /// The transferred value.
    pub const fn value(&self) -> U256 {
        match self {
            Self::Legacy(tx) => tx.value,
            Self::Eip2930(tx) => tx.value,
            Self::Eip1559(tx) => tx.value,
        }
    }

    /// The call data.
    pub const fn input(&self) -> &Bytes {
        match self {
            Self::Legacy(tx) => &tx.input,
            Self::Eip2930(tx) => &tx.input,
            Self::Eip1559(tx) => &tx.input,
        }
    }

    /// The gas price of a non-dynamic-fee transaction.
    pub const fn gas_price(&self) -> Option<u128> {
        match self {
            Self::Legacy(tx) => Some(tx.gas_price),
            Self::Eip2930(tx) => Some(tx.gas_price),
            Self::Eip1559(_) => None,
        }
    }

    /// The maximum fee per gas the sender is willing to pay. For legacy
    /// transactions this is the gas price.
    pub const fn max_fee_per_gas(&self) -> u128 {
        match self {
            Self::Legacy(tx) => tx.gas_price,
            Self::Eip2930(tx) => tx.gas_price,
            Self::Eip1559(tx) => tx.max_fee_per_gas,
        }
    }

    /// The maximum priority fee per gas, for dynamic fee transactions.
    pub const fn max_priority_fee_per_gas(&self) -> Option<u128> {
        match self {
            Self::Legacy(_) | Self::Eip2930(_) => None,
            Self::Eip1559(tx) => Some(tx.max_priority_fee_per_gas),
        }
    }

    /// The tip per gas the block producer earns at the given base fee, or
    /// `None` if the transaction cannot be included because its fee cap is
    /// below the base fee.
    pub fn effective_tip_per_gas(&self, base_fee: Option<u64>) -> Option<u128> {
        let base_fee = match base_fee {
            Some(base_fee) => base_fee as u128,
            None => return Some(self.priority_fee_or_price()),
        };

        let max_fee = self.max_fee_per_gas();
        if max_fee < base_fee {
            return None
        }

        let fee = max_fee - base_fee;
        match self.max_priority_fee_per_gas() {
            Some(priority_fee) => Some(fee.min(priority_fee)),
            None => Some(fee),
        }
    }

    /// The priority fee of a dynamic fee transaction, or the gas price.
    pub const fn priority_fee_or_price(&self) -> u128 {
        match self {
            Self::Legacy(tx) => tx.gas_price,
            Self::Eip2930(tx) => tx.gas_price,
            Self::Eip1559(tx) => tx.max_priority_fee_per_gas,
        }
    }

    /// The price per gas the sender actually pays in a block with the given
    /// base fee: `min(max_fee, base_fee + priority_fee)`.
    pub fn effective_gas_price(&self, base_fee: Option<u64>) -> u128 {
        match self {
            Self::Legacy(tx) => tx.gas_price,
            Self::Eip2930(tx) => tx.gas_price,
            Self::Eip1559(tx) => match base_fee {
                None => tx.max_fee_per_gas,
                Some(base_fee) => tx
                    .max_fee_per_gas
                    .min((base_fee as u128).saturating_add(tx.max_priority_fee_per_gas)),
            },
        }
    }

    /// An upper bound on the wei the sender needs to afford this transaction:
    /// `gas_limit * max_fee + value`.
    pub fn cost(&self) -> U256 {
        let gas_cost = U256::from(self.gas_limit()) * U256::from(self.max_fee_per_gas());
        gas_cost.saturating_add(self.value())
    }

    /// The hash the sender signed.
    pub fn signature_hash(&self) -> B256 {
        match self {
            Self::Legacy(tx) => tx.signature_hash(),
            Self::Eip2930(tx) => tx.signature_hash(),
            Self::Eip1559(tx) => tx.signature_hash(),
        }
    }

    fn fields_len(&self) -> usize {
        match self {
            Self::Legacy(tx) => tx.fields_len(),
            Self::Eip2930(tx) => tx.fields_len(),
            Self::Eip1559(tx) => tx.fields_len(),
        }
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        match self {
            Self::Legacy(tx) => tx.encode_fields(out),
            Self::Eip2930(tx) => tx.encode_fields(out),
            Self::Eip1559(tx) => tx.encode_fields(out),
        }
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::Legacy(TxLegacy::default())
    }
}

/// A [`Transaction`] with its [`Signature`] and memoized hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TransactionSigned {
    /// The inner transaction.
    pub transaction: Transaction,
    /// The signature over the transaction's signing hash.
    pub signature: Signature,
    /// The cached transaction hash.
    hash: TxHash,
}

impl TransactionSigned {
    /// Combines a transaction and a signature, computing the hash.
    pub fn from_transaction_and_signature(
        transaction: Transaction,
        signature: Signature,
    ) -> Self {
        let mut enveloped = Vec::new();
        encode_with_signature(&transaction, &signature, &mut enveloped, false);
        let hash = keccak256(&enveloped);
        Self { transaction, signature, hash }
    }

    /// The hash of the transaction: `keccak256` of its EIP-2718 envelope.
    pub const fn hash(&self) -> TxHash {
        self.hash
    }

    /// Recovers the sender of this transaction, or `None` if the signature is
    /// invalid.
    pub fn recover_signer(&self) -> Option<Address> {
        self.signature.recover_signer(self.transaction.signature_hash())
    }

    /// Encodes the EIP-2718 envelope: the bare list for a legacy transaction,
    /// `type || rlp(fields, signature)` for typed ones. This is the form the
    /// transaction hash and the transactions trie commit to.
    pub fn encode_enveloped(&self, out: &mut dyn BufMut) {
        encode_with_signature(&self.transaction, &self.signature, out, false)
    }

    /// The length of the EIP-2718 envelope.
    pub fn enveloped_length(&self) -> usize {
        payload_len_with_signature(&self.transaction, &self.signature, false)
    }

    fn decode_rlp_legacy(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = alloy_rlp::Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString)
        }
        let remaining = buf.len();

        let mut tx = TxLegacy::decode_fields(buf)?;
        let (signature, chain_id) = Signature::decode_with_eip155_chain_id(buf)?;
        tx.chain_id = chain_id;

        if remaining - buf.len() != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: remaining - buf.len(),
            })
        }

        Ok(Self::from_transaction_and_signature(Transaction::Legacy(tx), signature))
    }

    fn decode_typed(data: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let tx_type = TxType::try_from(*data.first().ok_or(alloy_rlp::Error::InputTooShort)?)?;
        *data = &data[1..];

        let header = alloy_rlp::Header::decode(data)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString)
        }
        let remaining = data.len();

        let transaction = match tx_type {
            TxType::Legacy => return Err(alloy_rlp::Error::Custom("legacy type byte in envelope")),
            TxType::Eip2930 => Transaction::Eip2930(TxEip2930::decode_fields(data)?),
            TxType::Eip1559 => Transaction::Eip1559(TxEip1559::decode_fields(data)?),
        };
        let signature = Signature::decode_parity_r_s(data)?;

        if remaining - data.len() != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: remaining - data.len(),
            })
        }

        Ok(Self::from_transaction_and_signature(transaction, signature))
    }
}

impl Deref for TransactionSigned {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

/// On the wire a typed transaction rides inside an RLP byte string, a legacy
/// one is a bare list; see [EIP-2718](https://eips.ethereum.org/EIPS/eip-2718).
impl Encodable for TransactionSigned {
    fn encode(&self, out: &mut dyn BufMut) {
        encode_with_signature(&self.transaction, &self.signature, out, true)
    }

    fn length(&self) -> usize {
        payload_len_with_signature(&self.transaction, &self.signature, true)
    }
}

impl Decodable for TransactionSigned {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        if first >= EMPTY_LIST_CODE {
            return Self::decode_rlp_legacy(buf)
        }

        // typed envelope, wrapped in a byte string
        let header = alloy_rlp::Header::decode(buf)?;
        if header.list {
            return Err(alloy_rlp::Error::UnexpectedList)
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort)
        }

        let mut payload = &buf[..header.payload_length];
        let tx = Self::decode_typed(&mut payload)?;
        if !payload.is_empty() {
            return Err(alloy_rlp::Error::UnexpectedLength)
        }

        *buf = &buf[header.payload_length..];
        Ok(tx)
    }
}

fn typed_payload_length(transaction: &Transaction, signature: &Signature) -> usize {
    transaction.fields_len() + signature.payload_len()
}

fn payload_len_with_signature(
    transaction: &Transaction,
    signature: &Signature,
    with_header: bool,
) -> usize {
    match transaction {
        Transaction::Legacy(tx) => {
            let payload_length =
                tx.fields_len() + signature.payload_len_with_eip155_chain_id(tx.chain_id);
            // a legacy transaction is a bare list in every context
            payload_length + length_of_length(payload_length)
        }
        _ => {
            let payload_length = typed_payload_length(transaction, signature);
            let envelope_length =
                1 + length_of_length(payload_length) + payload_length;
            if with_header {
                envelope_length +
                    length_of_length(envelope_length)
            } else {
                envelope_length
            }
        }
    }
}

fn encode_with_signature(
    transaction: &Transaction,
    signature: &Signature,
    out: &mut dyn BufMut,
    with_header: bool,
) {
    match transaction {
        Transaction::Legacy(tx) => {
            let payload_length =
                tx.fields_len() + signature.payload_len_with_eip155_chain_id(tx.chain_id);
            alloy_rlp::Header { list: true, payload_length }.encode(out);
            tx.encode_fields(out);
            signature.encode_with_eip155_chain_id(out, tx.chain_id);
        }
        _ => {
            let payload_length = typed_payload_length(transaction, signature);
            if with_header {
                let envelope_length =
                    1 + length_of_length(payload_length) + payload_length;
                alloy_rlp::Header { list: false, payload_length: envelope_length }.encode(out);
            }
            out.put_u8(transaction.tx_type() as u8);
            alloy_rlp::Header { list: true, payload_length }.encode(out);
            transaction.encode_fields(out);
            signature.encode_parity_r_s(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::util::{secret_key_to_address, sign_message};
    use secp256k1::SecretKey;

    fn sign(transaction: Transaction, secret: &SecretKey) -> TransactionSigned {
        let signature = sign_message(secret, transaction.signature_hash());
        TransactionSigned::from_transaction_and_signature(transaction, signature)
    }

    #[test]
    fn legacy_roundtrip_and_recovery() {
        let secret = SecretKey::from_slice(&[0x01; 32]).unwrap();
        let sender = secret_key_to_address(&secret);

        let tx = sign(
            Transaction::Legacy(TxLegacy {
                chain_id: Some(4),
                nonce: 2,
                gas_price: 1_000_000_000,
                gas_limit: 21_000,
                to: TxKind::Call(Address::repeat_byte(0x42)),
                value: U256::from(1_000u64),
                input: Bytes::new(),
            }),
            &secret,
        );

        let mut encoded = Vec::new();
        tx.encode(&mut encoded);
        assert_eq!(encoded.len(), tx.length());

        let decoded = TransactionSigned::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.recover_signer(), Some(sender));
    }

    #[test]
    fn eip1559_roundtrip_and_recovery() {
        let secret = SecretKey::from_slice(&[0x02; 32]).unwrap();
        let sender = secret_key_to_address(&secret);

        let tx = sign(
            Transaction::Eip1559(TxEip1559 {
                chain_id: 4,
                nonce: 26,
                max_priority_fee_per_gas: 1_500_000_000,
                max_fee_per_gas: 1_500_000_013,
                gas_limit: 21_000,
                to: TxKind::Call(Address::repeat_byte(0x61)),
                value: U256::from(3_000_000_000_000_000_000u64),
                access_list: AccessList::default(),
                input: Bytes::new(),
            }),
            &secret,
        );

        let mut encoded = Vec::new();
        tx.encode(&mut encoded);
        assert_eq!(encoded.len(), tx.length());
        // typed payloads ride in a byte string on the wire
        assert!(encoded[0] < EMPTY_LIST_CODE);

        let decoded = TransactionSigned::decode(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.recover_signer(), Some(sender));
    }

    #[test]
    fn effective_tip_excludes_underpriced() {
        let tx = Transaction::Eip1559(TxEip1559 {
            max_fee_per_gas: 6,
            max_priority_fee_per_gas: 1,
            ..Default::default()
        });
        assert_eq!(tx.effective_tip_per_gas(Some(7)), None);
        assert_eq!(tx.effective_tip_per_gas(Some(5)), Some(1));
        assert_eq!(tx.effective_tip_per_gas(Some(6)), Some(0));
    }

    #[test]
    fn effective_gas_price_is_capped() {
        let tx = Transaction::Eip1559(TxEip1559 {
            max_fee_per_gas: 100,
            max_priority_fee_per_gas: 10,
            ..Default::default()
        });
        assert_eq!(tx.effective_gas_price(Some(80)), 90);
        assert_eq!(tx.effective_gas_price(Some(95)), 100);
        assert_eq!(tx.effective_gas_price(None), 100);
    }

    #[test]
    fn unknown_tx_type_rejected() {
        // string-wrapped envelope with type byte 0x05
        let mut encoded = Vec::new();
        Bytes::from_static(&[0x05, 0xc0]).encode(&mut encoded);
        assert!(TransactionSigned::decode(&mut encoded.as_slice()).is_err());
    }
}
