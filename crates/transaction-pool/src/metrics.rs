use metrics::{counter, gauge, Counter, Gauge};

/// Transaction pool metrics.
pub(crate) struct TxPoolMetrics {
    /// Number of transactions inserted into the pool.
    pub(crate) inserted_transactions: Counter,
    /// Number of transactions that replaced a pooled one.
    pub(crate) replaced_transactions: Counter,
    /// Number of transactions removed, mined ones included.
    pub(crate) removed_transactions: Counter,
    /// Number of transactions rejected on insert.
    pub(crate) invalid_transactions: Counter,
    /// Transactions currently in the pool.
    pub(crate) pooled_transactions: Gauge,
}

impl std::fmt::Debug for TxPoolMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxPoolMetrics").finish_non_exhaustive()
    }
}

impl Default for TxPoolMetrics {
    fn default() -> Self {
        Self {
            inserted_transactions: counter!("transaction_pool_inserted_transactions"),
            replaced_transactions: counter!("transaction_pool_replaced_transactions"),
            removed_transactions: counter!("transaction_pool_removed_transactions"),
            invalid_transactions: counter!("transaction_pool_invalid_transactions"),
            pooled_transactions: gauge!("transaction_pool_pooled_transactions"),
        }
    }
}
