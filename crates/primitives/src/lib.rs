#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
//! Commonly used types for the ember execution core.
//!
//! This crate contains Ethereum primitive types shared by the wire protocol,
//! the transaction pool and the block assembly loop: headers, blocks,
//! signed transactions, receipts and the constants that govern them.

mod basefee;
mod block;
pub mod constants;
mod error;
mod header;
mod receipt;
pub mod proofs;
pub mod transaction;

pub use basefee::{calc_next_block_base_fee, BaseFeeParams};
pub use block::{Block, BlockBody, BlockHashOrNumber, SealedBlock};
pub use constants::*;
pub use error::GotExpected;
pub use header::{Header, SealedHeader};
pub use receipt::{logs_bloom, Receipt, ReceiptWithBloom};
pub use transaction::{
    util::{public_key_to_address, secret_key_to_address, sign_message},
    AccessList, AccessListItem, Signature, Transaction, TransactionSigned, TxEip1559, TxEip2930,
    TxLegacy, TxType,
};

// Re-export the base layer so downstream crates agree on one version.
pub use alloy_primitives::{
    self, address, b256, bytes, hex, keccak256, Address, Bloom, Bytes, Log, LogData, TxHash,
    TxKind, B256, B512, B64, U256,
};

/// A peer identifier: the uncompressed secp256k1 public key of the remote
/// node, as exchanged during the RLPx handshake.
pub type PeerId = B512;

/// A block number.
pub type BlockNumber = u64;
