//! Pooled transaction queries, available from `eth/65` on.

use alloy_primitives::B256;
use alloy_rlp::{RlpDecodableWrapper, RlpEncodableWrapper};
use ember_primitives::TransactionSigned;

/// A request for pooled transactions by hash, typically following a
/// [`NewPooledTransactionHashes`](crate::NewPooledTransactionHashes)
/// announcement.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct GetPooledTransactions(
    /// The hashes of the requested transactions.
    pub Vec<B256>,
);

impl<T> From<Vec<T>> for GetPooledTransactions
where
    T: Into<B256>,
{
    fn from(hashes: Vec<T>) -> Self {
        Self(hashes.into_iter().map(Into::into).collect())
    }
}

/// The response to [`GetPooledTransactions`]: the bodies that were still in
/// the pool, in request order, unknown hashes skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default, RlpEncodableWrapper, RlpDecodableWrapper)]
pub struct PooledTransactions(
    /// The requested transactions.
    pub Vec<TransactionSigned>,
);

impl From<Vec<TransactionSigned>> for PooledTransactions {
    fn from(transactions: Vec<TransactionSigned>) -> Self {
        Self(transactions)
    }
}
