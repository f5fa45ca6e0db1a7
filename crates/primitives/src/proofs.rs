//! Helpers for computing the ordered trie roots a block header commits to.
//!
//! The state root is owned by the execution collaborator; only the roots
//! derivable from block content are computed here.

use crate::{Header, ReceiptWithBloom, TransactionSigned};
use alloy_primitives::{keccak256, B256};
use alloy_trie::root::ordered_trie_root_with_encoder;

/// Computes the root of the trie of the given transactions.
pub fn calculate_transaction_root(transactions: &[TransactionSigned]) -> B256 {
    ordered_trie_root_with_encoder(transactions, |tx, buf| tx.encode_enveloped(buf))
}

/// Computes the root of the trie of the given receipts.
pub fn calculate_receipt_root(receipts: &[ReceiptWithBloom]) -> B256 {
    ordered_trie_root_with_encoder(receipts, |receipt, buf| receipt.encode_enveloped(buf))
}

/// Computes the hash of the given ommer headers list.
pub fn calculate_ommers_root(ommers: &[Header]) -> B256 {
    let mut out = Vec::new();
    alloy_rlp::encode_list(ommers, &mut out);
    keccak256(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EMPTY_OMMER_ROOT, EMPTY_TRANSACTIONS};

    #[test]
    fn empty_roots_match_known_constants() {
        assert_eq!(calculate_transaction_root(&[]), EMPTY_TRANSACTIONS);
        assert_eq!(calculate_receipt_root(&[]), EMPTY_TRANSACTIONS);
        assert_eq!(calculate_ommers_root(&[]), EMPTY_OMMER_ROOT);
    }
}
