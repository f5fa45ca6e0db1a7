#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
//! The pending block builder and the contracts it drives execution through.
//!
//! The interpreter and the state trie live behind the [`Evm`] and
//! [`EvmState`] traits; this crate owns the workspace that turns pool
//! transactions into a sealed block.

mod builder;
pub mod mock;
mod traits;

pub use builder::{BlockBuilder, BlockBuilderError, HeaderAttributes};
pub use traits::{Evm, EvmError, EvmState, ExecutionError, ExecutionOutcome};
