//! Ethereum protocol constants.

use alloy_primitives::{b256, B256, U256};

/// The minimum gas any transaction costs: the intrinsic gas of a plain
/// value transfer. A block with less than this much gas remaining is full.
pub const MIN_TRANSACTION_GAS: u64 = 21_000;

/// Initial base fee of the first EIP-1559 block, in wei.
pub const EIP1559_INITIAL_BASE_FEE: u64 = 1_000_000_000;

/// Default elasticity multiplier from EIP-1559: the gas target is the gas
/// limit divided by this.
pub const EIP1559_DEFAULT_ELASTICITY_MULTIPLIER: u64 = 2;

/// Default base fee max change denominator from EIP-1559.
pub const EIP1559_DEFAULT_BASE_FEE_MAX_CHANGE_DENOMINATOR: u64 = 8;

/// Ommer root of an empty list: `keccak256(rlp([]))`.
pub const EMPTY_OMMER_ROOT: B256 =
    b256!("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347");

/// Root of an empty trie: `keccak256(rlp(""))`.
pub const EMPTY_ROOT: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Transactions root of a block with no transactions.
pub const EMPTY_TRANSACTIONS: B256 = EMPTY_ROOT;

/// Receipts root of a block with no receipts.
pub const EMPTY_RECEIPTS: B256 = EMPTY_ROOT;

/// Number of vanity bytes at the front of a Clique header's extra-data.
pub const CLIQUE_EXTRA_VANITY: usize = 32;

/// Number of signature bytes at the back of a Clique header's extra-data.
pub const CLIQUE_EXTRA_SEAL: usize = 65;

/// Difficulty of a Clique block produced by the in-turn signer.
pub const CLIQUE_DIFF_IN_TURN: U256 = U256::from_limbs([2, 0, 0, 0]);

/// Difficulty of a Clique block produced by an out-of-turn signer.
pub const CLIQUE_DIFF_NO_TURN: U256 = U256::from_limbs([1, 0, 0, 0]);
