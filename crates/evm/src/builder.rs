use crate::{EvmState, ExecutionError};
use alloy_primitives::{Address, Bloom, Bytes, U256};
use ember_chain::clique;
use ember_primitives::{
    constants::EMPTY_OMMER_ROOT, proofs, Header, Receipt, ReceiptWithBloom, SealedBlock,
    SealedHeader, TransactionSigned,
};
use secp256k1::SecretKey;
use tracing::trace;

/// The header fields the caller fixes before assembly starts.
#[derive(Debug, Clone, Default)]
pub struct HeaderAttributes {
    /// Number of the pending block.
    pub number: u64,
    /// Difficulty of the pending block (2/1 for in-turn/out-of-turn Clique).
    pub difficulty: U256,
    /// Gas limit of the pending block.
    pub gas_limit: u64,
    /// EIP-1559 base fee, when London is active.
    pub base_fee_per_gas: Option<u64>,
    /// Timestamp of the pending block.
    pub timestamp: u64,
    /// Fee recipient.
    pub beneficiary: Address,
    /// Vanity extra-data.
    pub extra_data: Bytes,
}

/// Failures of [`BlockBuilder::add_transaction`]. All of them leave the
/// builder usable; none abort assembly on their own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockBuilderError {
    /// The transaction does not fit in the gas remaining in the block.
    #[error("transaction gas limit {requested} exceeds remaining block gas {available}")]
    GasLimitExceeded {
        /// The transaction's gas limit.
        requested: u64,
        /// Gas left in the block.
        available: u64,
    },
    /// The transaction's fee cap is below the block's base fee, so it cannot
    /// be included before execution is even attempted.
    #[error("fee cap {max_fee_per_gas} below block base fee {base_fee}")]
    FeeCapBelowBaseFee {
        /// The transaction's maximum fee per gas.
        max_fee_per_gas: u128,
        /// The block's base fee.
        base_fee: u64,
    },
    /// Executing the transaction failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Incrementally assembles a pending block inside a private state snapshot.
///
/// Transactions are executed one by one; accepted ones accrue into the body
/// and the cumulative gas counter. [`BlockBuilder::build`] commits the
/// snapshot and seals, [`BlockBuilder::discard`] throws it away.
#[derive(Debug)]
pub struct BlockBuilder<S> {
    state: S,
    header: Header,
    transactions: Vec<TransactionSigned>,
    receipts: Vec<ReceiptWithBloom>,
    clique_signer: Option<SecretKey>,
}

impl<S: EvmState> BlockBuilder<S> {
    /// Opens a builder on top of `parent` with the given attributes.
    pub fn new(
        state: S,
        parent: &SealedHeader,
        attributes: HeaderAttributes,
        clique_signer: Option<SecretKey>,
    ) -> Self {
        let header = Header {
            parent_hash: parent.hash(),
            ommers_hash: EMPTY_OMMER_ROOT,
            beneficiary: attributes.beneficiary,
            difficulty: attributes.difficulty,
            number: attributes.number,
            gas_limit: attributes.gas_limit,
            gas_used: 0,
            timestamp: attributes.timestamp,
            extra_data: attributes.extra_data,
            base_fee_per_gas: attributes.base_fee_per_gas,
            ..Default::default()
        };
        Self { state, header, transactions: Vec::new(), receipts: Vec::new(), clique_signer }
    }

    /// The pending header.
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Gas still available in the pending block.
    pub const fn gas_remaining(&self) -> u64 {
        self.header.gas_limit - self.header.gas_used
    }

    /// Number of transactions accepted so far.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Executes the transaction against the snapshot and, on success, appends
    /// it to the pending block.
    pub fn add_transaction(
        &mut self,
        transaction: &TransactionSigned,
        sender: Address,
    ) -> Result<(), BlockBuilderError> {
        let gas_limit = transaction.gas_limit();
        let available = self.gas_remaining();
        if gas_limit > available {
            return Err(BlockBuilderError::GasLimitExceeded { requested: gas_limit, available })
        }

        if let Some(base_fee) = self.header.base_fee_per_gas {
            let max_fee_per_gas = transaction.max_fee_per_gas();
            if max_fee_per_gas < base_fee as u128 {
                return Err(BlockBuilderError::FeeCapBelowBaseFee { max_fee_per_gas, base_fee })
            }
        }

        let outcome = self.state.execute(transaction, sender, &self.header)?;

        self.header.gas_used = self.header.gas_used.saturating_add(outcome.gas_used);
        let receipt = Receipt {
            tx_type: transaction.tx_type(),
            success: true,
            cumulative_gas_used: self.header.gas_used,
            logs: outcome.logs,
        }
        .with_bloom();

        trace!(
            hash = %transaction.hash(),
            gas_used = outcome.gas_used,
            cumulative = self.header.gas_used,
            "transaction added to pending block"
        );

        self.transactions.push(transaction.clone());
        self.receipts.push(receipt);
        Ok(())
    }

    /// Commits the snapshot, finalizes the header roots and seals the block,
    /// under the Clique key when one is configured.
    pub fn build(mut self) -> SealedBlock {
        self.header.transactions_root = proofs::calculate_transaction_root(&self.transactions);
        self.header.receipts_root = proofs::calculate_receipt_root(&self.receipts);
        self.header.logs_bloom = self
            .receipts
            .iter()
            .fold(Bloom::ZERO, |bloom, receipt| bloom | receipt.bloom);
        self.header.state_root = self.state.commit();

        let header = match &self.clique_signer {
            Some(secret) => clique::seal(self.header, secret),
            None => self.header,
        };

        SealedBlock { header: header.seal_slow(), body: self.transactions, ommers: Vec::new() }
    }

    /// Drops the snapshot without committing anything.
    pub fn discard(self) {
        drop(self)
    }
}
