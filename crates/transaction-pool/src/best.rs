use crate::PoolTransaction;
use alloy_primitives::Address;
use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, VecDeque},
    sync::Arc,
    time::Instant,
};

/// An entry in the priority heap: the head of one sender's lane.
#[derive(Debug)]
struct BestEntry {
    /// Effective tip per gas at the iterator's base fee.
    priority: u128,
    /// Submission time; on a price tie the transaction longer in the pool
    /// wins.
    submitted_at: Instant,
    transaction: Arc<PoolTransaction>,
}

impl PartialEq for BestEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BestEntry {}

impl PartialOrd for BestEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BestEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.submitted_at.cmp(&self.submitted_at))
    }
}

/// Iterator over the currently best executable transactions.
///
/// Senders' lanes are strictly nonce-ordered; the lane heads compete in a
/// max-heap keyed by effective gas price. Yielding a transaction promotes the
/// sender's next nonce into the heap.
#[derive(Debug)]
pub struct BestTransactions {
    /// Remaining lane per sender, with the on-chain nonce the lane started
    /// at.
    lanes: HashMap<Address, (u64, VecDeque<Arc<PoolTransaction>>)>,
    /// Count of transactions already yielded per sender.
    yielded: HashMap<Address, u64>,
    heap: BinaryHeap<BestEntry>,
    base_fee: Option<u64>,
}

impl BestTransactions {
    pub(crate) fn new(
        lanes: HashMap<Address, (u64, VecDeque<Arc<PoolTransaction>>)>,
        base_fee: Option<u64>,
    ) -> Self {
        let mut this =
            Self { lanes, yielded: HashMap::new(), heap: BinaryHeap::new(), base_fee };
        let senders: Vec<Address> = this.lanes.keys().copied().collect();
        for sender in senders {
            this.promote(sender);
        }
        this
    }

    /// Removes a sender's remaining transactions from the iteration. Used by
    /// consumers when a transaction failed and the rest of the lane can no
    /// longer execute.
    pub fn mark_invalid(&mut self, sender: Address) {
        self.lanes.remove(&sender);
    }

    /// Moves the head of the sender's lane into the heap, if it is still
    /// priced into the block.
    fn promote(&mut self, sender: Address) {
        let Some((_, lane)) = self.lanes.get_mut(&sender) else { return };
        let Some(transaction) = lane.pop_front() else { return };

        // a fee cap below the base fee ends the lane: later nonces could not
        // execute without this transaction anyway
        let Some(priority) = transaction.transaction().effective_tip_per_gas(self.base_fee)
        else {
            self.lanes.remove(&sender);
            return
        };

        self.heap.push(BestEntry {
            priority,
            submitted_at: transaction.submitted_at(),
            transaction,
        });
    }
}

impl Iterator for BestTransactions {
    type Item = Arc<PoolTransaction>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = self.heap.pop()?;
            let sender = entry.transaction.sender();

            // consumers may have invalidated the lane while its head was
            // already queued
            let Some((start, _)) = self.lanes.get(&sender) else { continue };

            // resynchronization guard: the popped transaction must be the
            // account nonce plus what this iteration already consumed
            let consumed = self.yielded.get(&sender).copied().unwrap_or_default();
            if entry.transaction.nonce() != start + consumed {
                self.lanes.remove(&sender);
                continue
            }

            *self.yielded.entry(sender).or_default() += 1;
            self.promote(sender);
            return Some(entry.transaction)
        }
    }
}
