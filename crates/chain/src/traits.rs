use crate::ChainSpec;
use alloy_primitives::{Address, B256, U256};
use ember_primitives::{GotExpected, SealedBlock, SealedHeader};

/// Read-only view of the canonical chain.
pub trait ChainReader: Send + Sync {
    /// The specification of the chain this view is over.
    fn chain_spec(&self) -> &ChainSpec;

    /// The header of the canonical head.
    fn latest_header(&self) -> SealedHeader;

    /// The canonical head block.
    fn latest_block(&self) -> SealedBlock;

    /// Total difficulty of the canonical chain up to and including the head.
    fn total_difficulty(&self) -> U256;

    /// A canonical header by number.
    fn header_by_number(&self, number: u64) -> Option<SealedHeader>;

    /// A header by hash.
    fn header_by_hash(&self, hash: B256) -> Option<SealedHeader>;

    /// The network id of the chain.
    fn network_id(&self) -> u64 {
        self.chain_spec().chain_id
    }

    /// The hash of the genesis block.
    fn genesis_hash(&self) -> B256 {
        self.chain_spec().genesis_hash()
    }
}

/// Import of new canonical blocks.
pub trait BlockImport: Send + Sync {
    /// Appends a block to the canonical chain.
    fn insert_block(&self, block: SealedBlock) -> Result<(), BlockImportError>;
}

/// Error returned when a block cannot be appended to the canonical chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockImportError {
    /// The block does not extend the canonical head.
    #[error("block #{number} does not extend the canonical head: parent hash {parent_hash}")]
    NonCanonicalParent {
        /// Number of the rejected block.
        number: u64,
        /// Parent hash the rejected block points at.
        parent_hash: B256,
    },
    /// The block number is not the successor of the head.
    #[error("unexpected block number: {0}")]
    UnexpectedNumber(GotExpected<u64>),
}

/// Clique signer bookkeeping, read by the block assembly loop.
pub trait CliqueReader: Send + Sync {
    /// Whether the given signer is in turn for the block at `number`.
    fn signer_in_turn(&self, signer: Address, number: u64) -> bool;

    /// The currently authorized signers, in address order.
    fn active_signers(&self) -> Vec<Address>;

    /// Whether the signer sealed one of the recent blocks and must hold off,
    /// per the `floor(signers / 2) + 1` spacing rule.
    fn recently_signed(&self, signer: Address, number: u64) -> bool;
}
