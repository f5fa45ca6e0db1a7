use alloy_primitives::{Address, Log, B256, U256};
use ember_primitives::{GotExpected, Header, SealedHeader, TransactionSigned};

/// Handle to the execution collaborator: hands out isolated state snapshots
/// the block builder executes against.
pub trait Evm: Send + Sync {
    /// The state snapshot type.
    type State: EvmState;

    /// Forks an isolated snapshot of the state the given header committed to.
    ///
    /// When `parent` is the genesis block and the backing state was never
    /// initialized, the canonical genesis allocation is applied first.
    fn fork(&self, parent: &SealedHeader) -> Result<Self::State, EvmError>;
}

/// A private, mutable state snapshot.
///
/// Mutations stay invisible until [`EvmState::commit`]; dropping the snapshot
/// discards them.
pub trait EvmState: Send {
    /// The current nonce of the given account.
    fn nonce(&self, address: Address) -> u64;

    /// The current balance of the given account.
    fn balance(&self, address: Address) -> U256;

    /// Executes a transaction against the snapshot in the environment of the
    /// given pending header. On success the state transition is applied to
    /// the snapshot; on error the snapshot is unchanged.
    fn execute(
        &mut self,
        transaction: &TransactionSigned,
        sender: Address,
        header: &Header,
    ) -> Result<ExecutionOutcome, ExecutionError>;

    /// Persists the snapshot and returns the root of the resulting state.
    fn commit(&mut self) -> B256;
}

/// The observable result of executing a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Gas the transaction consumed.
    pub gas_used: u64,
    /// Logs the transaction emitted.
    pub logs: Vec<Log>,
}

/// Errors the execution collaborator can return for a snapshot request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvmError {
    /// No state is available for the requested root.
    #[error("no state for root {0}")]
    UnknownStateRoot(B256),
}

/// Per-transaction execution failures. These never abort block assembly; the
/// offending transaction is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The transaction's nonce does not match the sender's account nonce.
    #[error("nonce mismatch for {sender}: {nonce}")]
    NonceMismatch {
        /// The sending account.
        sender: Address,
        /// Observed and expected nonce.
        nonce: GotExpected<u64>,
    },
    /// The sender cannot cover the transaction's upfront cost.
    #[error("insufficient balance of {sender}: have {available}, need {required}")]
    InsufficientBalance {
        /// The sending account.
        sender: Address,
        /// The sender's balance.
        available: U256,
        /// The upfront cost of the transaction.
        required: U256,
    },
    /// Execution reverted.
    #[error("transaction reverted")]
    Revert,
}
