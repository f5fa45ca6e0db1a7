//! Typed payloads of the `eth` protocol messages.

mod blocks;
mod broadcast;
mod receipts;
mod state;
mod transactions;

pub use blocks::{
    BlockBodies, BlockHeaders, GetBlockBodies, GetBlockHeaders, HeadersDirection,
    MAX_HEADERS_SERVE,
};
pub use broadcast::{BlockHashNumber, NewBlock, NewBlockHashes, NewPooledTransactionHashes, Transactions};
pub use receipts::{GetReceipts, Receipts};
pub use state::{GetNodeData, NodeData};
pub use transactions::{GetPooledTransactions, PooledTransactions};
