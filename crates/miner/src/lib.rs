#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
//! Block production for proof-of-authority chains: a timed, cancellable
//! assembly loop that drains the transaction pool into sealed blocks and
//! yields to the network whenever the canonical chain moves under it.

mod config;
mod metrics;
mod service;

pub use config::{CliqueSigner, MinerConfig, OUT_OF_TURN_DELAY_PER_SIGNER};
pub use service::{Miner, MinerHandle};
