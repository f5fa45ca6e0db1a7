#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
//! The transaction pool: a nonce-ordered, price-ordered queue of pending
//! transactions, shared between the network layer (which feeds and drains it
//! per peer) and the block assembly loop (which consumes the best
//! transactions).

mod best;
mod error;
mod metrics;
mod pool;
mod propagate;

pub use best::BestTransactions;
pub use error::PoolError;
pub use pool::{PoolTransaction, TransactionPool};
pub use propagate::PropagateTargets;
