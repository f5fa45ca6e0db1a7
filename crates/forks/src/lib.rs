#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
//! Hardfork schedule types and [EIP-2124](https://eips.ethereum.org/EIPS/eip-2124)
//! fork identifiers.

mod condition;
mod forkid;
mod hardfork;

pub use condition::ForkCondition;
pub use forkid::{ForkFilter, ForkHash, ForkId, ValidationError};
pub use hardfork::{Hardfork, UnknownHardfork};
