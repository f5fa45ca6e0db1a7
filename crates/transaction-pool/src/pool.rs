use crate::{
    best::BestTransactions, metrics::TxPoolMetrics, propagate::PropagateTargets, PoolError,
};
use alloy_primitives::{Address, TxHash};
use ember_primitives::{PeerId, SealedBlock, TransactionSigned};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    sync::Arc,
    time::Instant,
};
use tracing::{debug, trace};

/// A transaction in the pool, with its recovered sender and submission time.
#[derive(Debug, Clone)]
pub struct PoolTransaction {
    transaction: TransactionSigned,
    sender: Address,
    submitted_at: Instant,
}

impl PoolTransaction {
    /// The hash of the transaction.
    pub fn hash(&self) -> TxHash {
        self.transaction.hash()
    }

    /// The recovered sender.
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// The sender's nonce.
    pub fn nonce(&self) -> u64 {
        self.transaction.nonce()
    }

    /// When the transaction entered the pool.
    pub const fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// The signed transaction itself.
    pub const fn transaction(&self) -> &TransactionSigned {
        &self.transaction
    }
}

#[derive(Debug, Default)]
struct PoolInner {
    /// All pooled transactions by hash.
    by_hash: HashMap<TxHash, Arc<PoolTransaction>>,
    /// Pooled transactions grouped by sender, ordered by nonce.
    by_sender: HashMap<Address, BTreeMap<u64, Arc<PoolTransaction>>>,
    /// Which peers are already aware of a transaction, to break re-broadcast
    /// loops.
    known_by_peer: HashMap<TxHash, HashSet<PeerId>>,
}

/// The shared transaction pool.
///
/// All mutation goes through one lock; the network side and the block
/// assembly loop both hold an `Arc` of the pool.
#[derive(Default)]
pub struct TransactionPool {
    inner: RwLock<PoolInner>,
    metrics: TxPoolMetrics,
}

impl std::fmt::Debug for TransactionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionPool")
            .field("transactions", &self.len())
            .finish_non_exhaustive()
    }
}

impl TransactionPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pooled transactions.
    pub fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_hash.is_empty()
    }

    /// Whether the pool holds the given transaction.
    pub fn contains(&self, hash: &TxHash) -> bool {
        self.inner.read().by_hash.contains_key(hash)
    }

    /// Returns the pooled transaction with the given hash.
    pub fn get(&self, hash: &TxHash) -> Option<Arc<PoolTransaction>> {
        self.inner.read().by_hash.get(hash).cloned()
    }

    /// Returns the pooled transactions for the given hashes, skipping unknown
    /// ones.
    pub fn get_all(&self, hashes: &[TxHash]) -> Vec<Arc<PoolTransaction>> {
        let inner = self.inner.read();
        hashes.iter().filter_map(|hash| inner.by_hash.get(hash).cloned()).collect()
    }

    /// All pooled transaction hashes.
    pub fn pooled_hashes(&self) -> Vec<TxHash> {
        self.inner.read().by_hash.keys().copied().collect()
    }

    /// Recovers the sender and inserts the transaction.
    ///
    /// At most one transaction per `(sender, nonce)` is kept; a newcomer must
    /// beat the incumbent's fee cap to replace it.
    pub fn add_transaction(&self, transaction: TransactionSigned) -> Result<TxHash, PoolError> {
        let hash = transaction.hash();
        let Some(sender) = transaction.recover_signer() else {
            self.metrics.invalid_transactions.increment(1);
            return Err(PoolError::InvalidSender(hash))
        };

        let mut inner = self.inner.write();
        if inner.by_hash.contains_key(&hash) {
            return Err(PoolError::AlreadyImported(hash))
        }

        let nonce = transaction.nonce();
        let mut replaced = None;
        if let Some(incumbent) = inner.by_sender.get(&sender).and_then(|txs| txs.get(&nonce)) {
            if transaction.max_fee_per_gas() <= incumbent.transaction.max_fee_per_gas() {
                self.metrics.invalid_transactions.increment(1);
                return Err(PoolError::ReplacementUnderpriced { sender, nonce })
            }
            replaced = Some(incumbent.hash());
        }

        if let Some(replaced) = replaced {
            inner.remove(&replaced);
            self.metrics.replaced_transactions.increment(1);
        }

        let pooled =
            Arc::new(PoolTransaction { transaction, sender, submitted_at: Instant::now() });
        inner.by_hash.insert(hash, pooled.clone());
        inner.by_sender.entry(sender).or_default().insert(nonce, pooled);

        self.metrics.inserted_transactions.increment(1);
        self.metrics.pooled_transactions.set(inner.by_hash.len() as f64);
        trace!(%hash, %sender, nonce, "transaction added to pool");
        Ok(hash)
    }

    /// Removes a transaction by hash.
    pub fn remove_transaction(&self, hash: &TxHash) -> Option<Arc<PoolTransaction>> {
        let mut inner = self.inner.write();
        let removed = inner.remove(hash);
        if removed.is_some() {
            self.metrics.removed_transactions.increment(1);
            self.metrics.pooled_transactions.set(inner.by_hash.len() as f64);
        }
        removed
    }

    /// Drops every transaction included in the given block, along with any
    /// pooled transaction made stale by the nonces the block consumed.
    pub fn on_mined_block(&self, block: &SealedBlock) {
        let mut inner = self.inner.write();
        let mut removed = 0u64;

        for transaction in &block.body {
            if inner.remove(&transaction.hash()).is_some() {
                removed += 1;
            }

            // stale entries of the same sender can never execute anymore
            if let Some(sender) = transaction.recover_signer() {
                let stale: Vec<TxHash> = inner
                    .by_sender
                    .get(&sender)
                    .map(|txs| {
                        txs.range(..=transaction.nonce()).map(|(_, tx)| tx.hash()).collect()
                    })
                    .unwrap_or_default();
                for hash in stale {
                    inner.remove(&hash);
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            self.metrics.removed_transactions.increment(removed);
            self.metrics.pooled_transactions.set(inner.by_hash.len() as f64);
            debug!(number = block.number(), removed, "pruned mined transactions");
        }
    }

    /// Returns an iterator yielding the currently best transactions for
    /// inclusion: per-sender nonce order, senders interleaved by effective
    /// gas price at the given base fee.
    ///
    /// `on_chain_nonce` supplies the account nonce a sender's lane must start
    /// at; transactions whose fee cap is below the base fee are excluded.
    pub fn best_transactions(
        &self,
        on_chain_nonce: impl Fn(Address) -> u64,
        base_fee: Option<u64>,
    ) -> BestTransactions {
        let inner = self.inner.read();

        let mut queues = HashMap::with_capacity(inner.by_sender.len());
        for (sender, txs) in &inner.by_sender {
            let start = on_chain_nonce(*sender);
            let mut lane = VecDeque::new();
            let mut expected = start;
            for (nonce, tx) in txs.range(start..) {
                // a gap ends the executable lane
                if *nonce != expected {
                    break
                }
                lane.push_back(tx.clone());
                expected += 1;
            }
            if !lane.is_empty() {
                queues.insert(*sender, (start, lane));
            }
        }

        BestTransactions::new(queues, base_fee)
    }

    /// Marks the given transactions as known by the peer.
    pub fn mark_known_by_peer(&self, peer: PeerId, hashes: &[TxHash]) {
        let _ = self.add_known_by_peer(peer, hashes);
    }

    /// Marks the given transactions as known by the peer and returns the
    /// subset the peer had not seen before.
    pub fn add_known_by_peer(&self, peer: PeerId, hashes: &[TxHash]) -> Vec<TxHash> {
        let mut inner = self.inner.write();
        hashes
            .iter()
            .copied()
            .filter(|hash| inner.known_by_peer.entry(*hash).or_default().insert(peer))
            .collect()
    }

    /// Whether the given peer already knows the transaction.
    pub fn is_known_by_peer(&self, peer: PeerId, hash: &TxHash) -> bool {
        self.inner
            .read()
            .known_by_peer
            .get(hash)
            .is_some_and(|peers| peers.contains(&peer))
    }

    /// Splits the peers unaware of `hash` into those that get the full
    /// transaction body and those that only get the hash announcement: full
    /// bodies go to the square root of the unaware subset.
    pub fn propagation_targets(&self, hash: TxHash, peers: &[PeerId]) -> PropagateTargets {
        let inner = self.inner.read();
        let unaware: Vec<PeerId> = peers
            .iter()
            .copied()
            .filter(|peer| {
                !inner.known_by_peer.get(&hash).is_some_and(|known| known.contains(peer))
            })
            .collect();
        PropagateTargets::split(unaware)
    }
}

impl PoolInner {
    fn remove(&mut self, hash: &TxHash) -> Option<Arc<PoolTransaction>> {
        let removed = self.by_hash.remove(hash)?;
        if let Some(txs) = self.by_sender.get_mut(&removed.sender) {
            txs.remove(&removed.nonce());
            if txs.is_empty() {
                self.by_sender.remove(&removed.sender);
            }
        }
        self.known_by_peer.remove(hash);
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, TxKind, B512, U256};
    use ember_primitives::{sign_message, Transaction, TxEip1559, TxLegacy};
    use secp256k1::SecretKey;

    fn signer(seed: u8) -> SecretKey {
        SecretKey::from_slice(&[seed; 32]).unwrap()
    }

    fn legacy_tx(secret: &SecretKey, nonce: u64, gas_price: u128) -> TransactionSigned {
        let tx = Transaction::Legacy(TxLegacy {
            chain_id: Some(1),
            nonce,
            gas_price,
            gas_limit: 21_000,
            to: TxKind::Call(Address::repeat_byte(0x11)),
            value: U256::ZERO,
            input: Bytes::new(),
        });
        let signature = sign_message(secret, tx.signature_hash());
        TransactionSigned::from_transaction_and_signature(tx, signature)
    }

    fn dynamic_tx(secret: &SecretKey, nonce: u64, max_fee: u128, tip: u128) -> TransactionSigned {
        let tx = Transaction::Eip1559(TxEip1559 {
            chain_id: 1,
            nonce,
            max_priority_fee_per_gas: tip,
            max_fee_per_gas: max_fee,
            gas_limit: 21_000,
            to: TxKind::Call(Address::repeat_byte(0x11)),
            value: U256::ZERO,
            access_list: Default::default(),
            input: Bytes::new(),
        });
        let signature = sign_message(secret, tx.signature_hash());
        TransactionSigned::from_transaction_and_signature(tx, signature)
    }

    #[test]
    fn insert_get_remove() {
        let pool = TransactionPool::new();
        let tx = legacy_tx(&signer(1), 0, 10);
        let hash = pool.add_transaction(tx.clone()).unwrap();

        assert!(pool.contains(&hash));
        assert_eq!(pool.get(&hash).unwrap().transaction(), &tx);
        assert_eq!(pool.len(), 1);

        pool.remove_transaction(&hash).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn duplicate_hash_rejected() {
        let pool = TransactionPool::new();
        let tx = legacy_tx(&signer(1), 0, 10);
        pool.add_transaction(tx.clone()).unwrap();
        assert_eq!(pool.add_transaction(tx.clone()), Err(PoolError::AlreadyImported(tx.hash())));
    }

    #[test]
    fn replacement_needs_higher_price() {
        let pool = TransactionPool::new();
        let secret = signer(1);

        let cheap = legacy_tx(&secret, 0, 10);
        pool.add_transaction(cheap.clone()).unwrap();

        // same (sender, nonce), lower price: rejected
        assert!(matches!(
            pool.add_transaction(legacy_tx(&secret, 0, 9)),
            Err(PoolError::ReplacementUnderpriced { .. })
        ));

        // higher price evicts the incumbent
        let better = legacy_tx(&secret, 0, 11);
        pool.add_transaction(better.clone()).unwrap();
        assert!(!pool.contains(&cheap.hash()));
        assert!(pool.contains(&better.hash()));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn best_orders_by_nonce_then_price() {
        // the nonce chain of a sender dominates cross-sender price order
        let pool = TransactionPool::new();
        let a = signer(1);
        let b = signer(2);

        pool.add_transaction(legacy_tx(&a, 0, 1)).unwrap();
        pool.add_transaction(legacy_tx(&a, 1, 2)).unwrap();
        pool.add_transaction(legacy_tx(&a, 2, 3)).unwrap();
        let b0 = pool.add_transaction(legacy_tx(&b, 0, 25)).unwrap();

        let order: Vec<(Address, u64)> = pool
            .best_transactions(|_| 0, None)
            .map(|tx| (tx.sender(), tx.nonce()))
            .collect();

        let a_addr = ember_primitives::secret_key_to_address(&a);
        let b_addr = ember_primitives::secret_key_to_address(&b);
        assert_eq!(order, vec![(b_addr, 0), (a_addr, 0), (a_addr, 1), (a_addr, 2)]);
        assert!(pool.contains(&b0));
    }

    #[test]
    fn best_skips_nonce_gaps() {
        let pool = TransactionPool::new();
        let a = signer(1);

        pool.add_transaction(legacy_tx(&a, 0, 1)).unwrap();
        pool.add_transaction(legacy_tx(&a, 2, 3)).unwrap();

        let yielded: Vec<u64> = pool.best_transactions(|_| 0, None).map(|tx| tx.nonce()).collect();
        assert_eq!(yielded, vec![0]);
    }

    #[test]
    fn best_excludes_fee_caps_below_base_fee() {
        let pool = TransactionPool::new();
        let a = signer(1);
        let b = signer(2);

        pool.add_transaction(dynamic_tx(&a, 0, 6, 1)).unwrap();
        pool.add_transaction(dynamic_tx(&b, 0, 20, 1)).unwrap();

        let yielded: Vec<Address> =
            pool.best_transactions(|_| 0, Some(7)).map(|tx| tx.sender()).collect();
        assert_eq!(yielded, vec![ember_primitives::secret_key_to_address(&b)]);
    }

    #[test]
    fn best_respects_on_chain_nonce() {
        let pool = TransactionPool::new();
        let a = signer(1);

        pool.add_transaction(legacy_tx(&a, 0, 1)).unwrap();
        pool.add_transaction(legacy_tx(&a, 1, 1)).unwrap();

        // account already consumed nonce 0
        let yielded: Vec<u64> = pool.best_transactions(|_| 1, None).map(|tx| tx.nonce()).collect();
        assert_eq!(yielded, vec![1]);
    }

    #[test]
    fn mined_block_prunes_included_and_stale() {
        let pool = TransactionPool::new();
        let a = signer(1);

        let replaced_flavor = legacy_tx(&a, 0, 10);
        pool.add_transaction(replaced_flavor).unwrap();
        pool.add_transaction(legacy_tx(&a, 1, 10)).unwrap();
        pool.add_transaction(legacy_tx(&a, 2, 10)).unwrap();

        // a block mined a different flavor of nonces 0 and 1
        let block = ember_primitives::Block {
            header: Default::default(),
            body: vec![legacy_tx(&a, 1, 99)],
            ommers: vec![],
        }
        .seal_slow();

        pool.on_mined_block(&block);

        let remaining: Vec<u64> =
            pool.best_transactions(|_| 2, None).map(|tx| tx.nonce()).collect();
        assert_eq!(remaining, vec![2]);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn known_by_peer_tracking() {
        let pool = TransactionPool::new();
        let hash = pool.add_transaction(legacy_tx(&signer(1), 0, 10)).unwrap();
        let peer = B512::repeat_byte(0x01);

        assert!(!pool.is_known_by_peer(peer, &hash));
        let unknown = pool.add_known_by_peer(peer, &[hash]);
        assert_eq!(unknown, vec![hash]);
        assert!(pool.is_known_by_peer(peer, &hash));

        // second marking reports nothing new
        assert!(pool.add_known_by_peer(peer, &[hash]).is_empty());
    }

    #[test]
    fn propagation_splits_on_sqrt() {
        let pool = TransactionPool::new();
        let hash = pool.add_transaction(legacy_tx(&signer(1), 0, 10)).unwrap();

        let peers: Vec<PeerId> = (0..9u8).map(B512::repeat_byte).collect();
        // one peer has already seen it
        pool.mark_known_by_peer(peers[0], &[hash]);

        let targets = pool.propagation_targets(hash, &peers);
        // 8 unaware peers, sqrt(8) rounds to 3 full bodies
        assert_eq!(targets.full.len(), 3);
        assert_eq!(targets.announce.len(), 5);
        assert!(!targets.full.contains(&peers[0]));
        assert!(!targets.announce.contains(&peers[0]));
    }
}
