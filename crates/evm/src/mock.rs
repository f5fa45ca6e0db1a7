//! A deterministic stand-in for the execution collaborator.
//!
//! Accounts are plain nonce/balance pairs, every transaction consumes exactly
//! its gas limit, and state roots are content hashes over the account table.
//! Transactions whose input starts with [`REVERT_MARKER`] revert.

use crate::{Evm, EvmError, EvmState, ExecutionError, ExecutionOutcome};
use alloy_primitives::{keccak256, Address, B256, U256};
use ember_primitives::{GotExpected, Header, SealedHeader, TransactionSigned};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

/// Input prefix that makes the mock report a revert.
pub const REVERT_MARKER: u8 = 0xfe;

type Accounts = HashMap<Address, MockAccount>;

/// Account state tracked by the mock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockAccount {
    /// The account's nonce.
    pub nonce: u64,
    /// The account's balance, in wei.
    pub balance: U256,
}

#[derive(Debug, Default)]
struct MockEvmInner {
    /// Committed account tables by state root.
    states: HashMap<B256, Accounts>,
    /// The genesis allocation, applied lazily on the first genesis fork.
    genesis_alloc: Accounts,
}

/// The mock execution collaborator.
#[derive(Debug, Clone, Default)]
pub struct MockEvm {
    inner: Arc<RwLock<MockEvmInner>>,
}

impl MockEvm {
    /// Creates a mock with an empty genesis allocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `balance` wei to the genesis allocation of `address`.
    pub fn fund(&self, address: Address, balance: U256) {
        let mut inner = self.inner.write();
        inner.genesis_alloc.entry(address).or_default().balance += balance;
    }
}

impl Evm for MockEvm {
    type State = MockState;

    fn fork(&self, parent: &SealedHeader) -> Result<MockState, EvmError> {
        let mut inner = self.inner.write();

        let accounts = match inner.states.get(&parent.state_root) {
            Some(accounts) => accounts.clone(),
            None if parent.number == 0 => {
                // uninitialized state under the genesis sentinel: apply the
                // canonical genesis allocation
                let accounts = inner.genesis_alloc.clone();
                inner.states.insert(parent.state_root, accounts.clone());
                accounts
            }
            None => return Err(EvmError::UnknownStateRoot(parent.state_root)),
        };

        Ok(MockState { accounts, shared: Arc::clone(&self.inner) })
    }
}

/// A forked account table. Mutations stay private until [`EvmState::commit`].
#[derive(Debug)]
pub struct MockState {
    accounts: Accounts,
    shared: Arc<RwLock<MockEvmInner>>,
}

impl MockState {
    fn state_root_of(accounts: &Accounts) -> B256 {
        let mut entries: Vec<_> = accounts.iter().collect();
        entries.sort_by_key(|(address, _)| **address);

        let mut preimage = Vec::with_capacity(entries.len() * 60);
        for (address, account) in entries {
            preimage.extend_from_slice(address.as_slice());
            preimage.extend_from_slice(&account.nonce.to_be_bytes());
            preimage.extend_from_slice(&account.balance.to_be_bytes::<32>());
        }
        keccak256(&preimage)
    }
}

impl EvmState for MockState {
    fn nonce(&self, address: Address) -> u64 {
        self.accounts.get(&address).map(|account| account.nonce).unwrap_or_default()
    }

    fn balance(&self, address: Address) -> U256 {
        self.accounts.get(&address).map(|account| account.balance).unwrap_or_default()
    }

    fn execute(
        &mut self,
        transaction: &TransactionSigned,
        sender: Address,
        header: &Header,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let account = self.accounts.get(&sender).copied().unwrap_or_default();

        let nonce = transaction.nonce();
        if nonce != account.nonce {
            return Err(ExecutionError::NonceMismatch {
                sender,
                nonce: GotExpected { got: nonce, expected: account.nonce },
            })
        }

        let gas_price = transaction.effective_gas_price(header.base_fee_per_gas);
        let required = U256::from(transaction.gas_limit()) * U256::from(gas_price) +
            transaction.value();
        if account.balance < required {
            return Err(ExecutionError::InsufficientBalance {
                sender,
                available: account.balance,
                required,
            })
        }

        if transaction.input().first() == Some(&REVERT_MARKER) {
            return Err(ExecutionError::Revert)
        }

        // the mock charges the full gas limit
        let gas_used = transaction.gas_limit();
        let cost = U256::from(gas_used) * U256::from(gas_price) + transaction.value();

        let sender_account = self.accounts.entry(sender).or_default();
        sender_account.nonce += 1;
        sender_account.balance -= cost;

        if let alloy_primitives::TxKind::Call(to) = transaction.to() {
            self.accounts.entry(to).or_default().balance += transaction.value();
        }

        Ok(ExecutionOutcome { gas_used, logs: Vec::new() })
    }

    fn commit(&mut self) -> B256 {
        let root = Self::state_root_of(&self.accounts);
        self.shared.write().states.insert(root, self.accounts.clone());
        root
    }
}
