//! Types for broadcasting new data.

use alloy_primitives::{B256, U256};
use alloy_rlp::{
    RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper,
};
use ember_primitives::{Block, TransactionSigned};

/// This informs peers of new blocks that have appeared on the network.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct NewBlockHashes(
    /// New block hashes and the block number for each block hash. Clients
    /// should request the blocks with a [`GetBlockBodies`](crate::GetBlockBodies)
    /// message.
    pub Vec<BlockHashNumber>,
);

impl NewBlockHashes {
    /// Returns the highest block in the announcement.
    pub fn latest(&self) -> Option<&BlockHashNumber> {
        self.0.iter().max_by_key(|block| block.number)
    }
}

/// A block hash _and_ a block number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct BlockHashNumber {
    /// The block hash.
    pub hash: B256,
    /// The block number.
    pub number: u64,
}

/// A new block with the current total difficulty, which includes the
/// difficulty of the announced block.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodable, RlpDecodable)]
pub struct NewBlock {
    /// The announced block.
    pub block: Block,
    /// The total difficulty of the chain up to and including it.
    pub td: U256,
}

/// This informs peers of transactions that have appeared on the network and
/// are not yet included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct Transactions(
    /// New transactions for the peer to include in its pool.
    pub Vec<TransactionSigned>,
);

impl From<Vec<TransactionSigned>> for Transactions {
    fn from(transactions: Vec<TransactionSigned>) -> Self {
        Self(transactions)
    }
}

impl From<Transactions> for Vec<TransactionSigned> {
    fn from(transactions: Transactions) -> Self {
        transactions.0
    }
}

/// This announces the hashes of transactions in the pool without shipping the
/// bodies, available from `eth/65` on.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct NewPooledTransactionHashes(
    /// Hashes the peer may fetch with a
    /// [`GetPooledTransactions`](crate::GetPooledTransactions) message.
    pub Vec<B256>,
);

impl From<Vec<B256>> for NewPooledTransactionHashes {
    fn from(hashes: Vec<B256>) -> Self {
        Self(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_rlp::{Decodable, Encodable};

    #[test]
    fn latest_block_of_announcement() {
        let mut blocks =
            NewBlockHashes(vec![BlockHashNumber { hash: B256::repeat_byte(1), number: 0 }]);
        assert_eq!(blocks.latest().unwrap().number, 0);

        blocks.0.push(BlockHashNumber { hash: B256::repeat_byte(2), number: 100 });
        blocks.0.push(BlockHashNumber { hash: B256::repeat_byte(3), number: 2 });
        assert_eq!(blocks.latest().unwrap().number, 100);
    }

    #[test]
    fn new_block_roundtrip() {
        let new_block = NewBlock {
            block: Block {
                header: ember_primitives::Header { number: 1, ..Default::default() },
                body: vec![],
                ommers: vec![],
            },
            td: U256::from(131_200u64),
        };

        let mut encoded = Vec::new();
        new_block.encode(&mut encoded);
        assert_eq!(NewBlock::decode(&mut encoded.as_slice()).unwrap(), new_block);
    }
}
