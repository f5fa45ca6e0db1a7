//! Receipt queries, available from `eth/63` on.

use alloy_primitives::B256;
use alloy_rlp::{RlpDecodableWrapper, RlpEncodableWrapper};
use ember_primitives::ReceiptWithBloom;

/// A request for the receipts of the given blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct GetReceipts(
    /// Hashes of the blocks whose receipts are requested.
    pub Vec<B256>,
);

/// The response to [`GetReceipts`]: one receipt list per requested block.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct Receipts(
    /// The receipts of each requested block, in request order.
    pub Vec<Vec<ReceiptWithBloom>>,
);

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_rlp::{Decodable, Encodable};
    use ember_primitives::{Receipt, TxType};

    #[test]
    fn receipts_roundtrip() {
        let receipts = Receipts(vec![vec![
            Receipt {
                tx_type: TxType::Legacy,
                success: true,
                cumulative_gas_used: 21_000,
                logs: vec![],
            }
            .with_bloom(),
            Receipt {
                tx_type: TxType::Eip1559,
                success: false,
                cumulative_gas_used: 42_000,
                logs: vec![],
            }
            .with_bloom(),
        ]]);

        let mut encoded = Vec::new();
        receipts.encode(&mut encoded);
        assert_eq!(encoded.len(), receipts.length());
        assert_eq!(Receipts::decode(&mut encoded.as_slice()).unwrap(), receipts);
    }
}
