//! State trie node queries, available from `eth/63` on.

use alloy_primitives::{Bytes, B256};
use alloy_rlp::{RlpDecodableWrapper, RlpEncodableWrapper};

/// A request for state trie nodes by hash.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct GetNodeData(
    /// Hashes of the requested trie nodes or contract code.
    pub Vec<B256>,
);

/// The response to [`GetNodeData`]: the raw node bytes that were found.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct NodeData(
    /// The requested nodes, unknown hashes skipped.
    pub Vec<Bytes>,
);

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_rlp::{Decodable, Encodable};

    #[test]
    fn node_data_roundtrip() {
        let response = NodeData(vec![Bytes::from_static(&[0x02, 0x03]), Bytes::new()]);
        let mut encoded = Vec::new();
        response.encode(&mut encoded);
        assert_eq!(NodeData::decode(&mut encoded.as_slice()).unwrap(), response);
    }
}
