use crate::transaction::TxType;
use alloy_primitives::{Bloom, Log};
use alloy_rlp::{length_of_length, Decodable, Encodable, EMPTY_LIST_CODE};
use bytes::BufMut;

/// The result of executing a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Receipt {
    /// The type of the transaction this receipt belongs to.
    pub tx_type: TxType,
    /// Whether the transaction executed successfully.
    pub success: bool,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Attaches the bloom filter computed from the logs.
    pub fn with_bloom(self) -> ReceiptWithBloom {
        let bloom = logs_bloom(self.logs.iter());
        ReceiptWithBloom { receipt: self, bloom }
    }
}

/// Computes the bloom filter over a set of logs.
pub fn logs_bloom<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for log in logs {
        bloom.m3_2048(log.address.as_slice());
        for topic in log.data.topics() {
            bloom.m3_2048(topic.as_slice());
        }
    }
    bloom
}

/// A [`Receipt`] with the bloom filter over its logs, the form that goes into
/// the receipts trie and onto the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiptWithBloom {
    /// The inner receipt.
    pub receipt: Receipt,
    /// Bloom filter over the receipt's logs.
    pub bloom: Bloom,
}

impl ReceiptWithBloom {
    fn payload_length(&self) -> usize {
        self.receipt.success.length() +
            self.receipt.cumulative_gas_used.length() +
            self.bloom.length() +
            self.receipt.logs.length()
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        alloy_rlp::Header { list: true, payload_length: self.payload_length() }.encode(out);
        self.receipt.success.encode(out);
        self.receipt.cumulative_gas_used.encode(out);
        self.bloom.encode(out);
        self.receipt.logs.encode(out);
    }

    /// Encodes the EIP-2718 receipt envelope, the form the receipts trie
    /// commits to: the bare list for a legacy receipt, `type || rlp(fields)`
    /// for typed ones.
    pub fn encode_enveloped(&self, out: &mut dyn BufMut) {
        self.encode_inner(out, false)
    }

    fn encode_inner(&self, out: &mut dyn BufMut, with_header: bool) {
        match self.receipt.tx_type {
            TxType::Legacy => self.encode_fields(out),
            tx_type => {
                if with_header {
                    let envelope_length = 1 + self.list_length();
                    alloy_rlp::Header { list: false, payload_length: envelope_length }.encode(out);
                }
                out.put_u8(tx_type as u8);
                self.encode_fields(out);
            }
        }
    }

    fn list_length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + length_of_length(payload_length)
    }

    fn inner_length(&self, with_header: bool) -> usize {
        match self.receipt.tx_type {
            TxType::Legacy => self.list_length(),
            _ => {
                let envelope_length = 1 + self.list_length();
                if with_header {
                    envelope_length +
                        length_of_length(envelope_length)
                } else {
                    envelope_length
                }
            }
        }
    }

    fn decode_fields(tx_type: TxType, buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = alloy_rlp::Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString)
        }
        let remaining = buf.len();

        let success = Decodable::decode(buf)?;
        let cumulative_gas_used = Decodable::decode(buf)?;
        let bloom = Decodable::decode(buf)?;
        let logs = Decodable::decode(buf)?;

        if remaining - buf.len() != header.payload_length {
            return Err(alloy_rlp::Error::ListLengthMismatch {
                expected: header.payload_length,
                got: remaining - buf.len(),
            })
        }

        Ok(Self { receipt: Receipt { tx_type, success, cumulative_gas_used, logs }, bloom })
    }
}

impl Encodable for ReceiptWithBloom {
    fn encode(&self, out: &mut dyn BufMut) {
        self.encode_inner(out, true)
    }

    fn length(&self) -> usize {
        self.inner_length(true)
    }
}

impl Decodable for ReceiptWithBloom {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let first = *buf.first().ok_or(alloy_rlp::Error::InputTooShort)?;
        if first >= EMPTY_LIST_CODE {
            return Self::decode_fields(TxType::Legacy, buf)
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
        let tx_type = TxType::try_from(*payload.first().ok_or(alloy_rlp::Error::InputTooShort)?)?;
        payload = &payload[1..];
        let receipt = Self::decode_fields(tx_type, &mut payload)?;
        if !payload.is_empty() {
            return Err(alloy_rlp::Error::UnexpectedLength)
        }

        *buf = &buf[header.payload_length..];
        Ok(receipt)
    }
}
