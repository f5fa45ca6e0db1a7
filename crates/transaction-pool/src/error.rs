use alloy_primitives::{Address, TxHash};

/// Errors of [`TransactionPool::add_transaction`](crate::TransactionPool::add_transaction).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The exact transaction is already in the pool.
    #[error("transaction {0} already imported")]
    AlreadyImported(TxHash),
    /// A transaction with the same sender and nonce is already pooled at an
    /// equal or better price.
    #[error("replacement transaction for sender {sender} nonce {nonce} is underpriced")]
    ReplacementUnderpriced {
        /// The sending account.
        sender: Address,
        /// The contested nonce.
        nonce: u64,
    },
    /// The sender could not be recovered from the signature.
    #[error("unable to recover the sender of transaction {0}")]
    InvalidSender(TxHash),
}
