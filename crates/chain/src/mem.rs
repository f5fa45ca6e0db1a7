use crate::{
    clique, BlockImport, BlockImportError, CanonStateNotification, CanonStateNotificationSender,
    CanonStateNotifications, CanonStateSubscriptions, ChainReader, ChainSpec, CliqueReader,
};
use alloy_primitives::{Address, B256, U256};
use ember_primitives::{GotExpected, SealedBlock, SealedHeader};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::broadcast;
use tracing::debug;

/// An in-memory canonical chain.
///
/// Backs the single-process proof-of-authority networks used in tests and dev
/// mode; everything lives behind one lock and nothing is persisted.
#[derive(Debug)]
pub struct InMemoryChain {
    spec: Arc<ChainSpec>,
    /// Authorized Clique signers, kept in address order.
    signers: Vec<Address>,
    inner: RwLock<ChainInner>,
    canon_tx: CanonStateNotificationSender,
}

#[derive(Debug)]
struct ChainInner {
    /// All canonical blocks by hash.
    blocks: HashMap<B256, Arc<SealedBlock>>,
    /// Canonical hash per block number, index = number.
    canonical: Vec<B256>,
    /// Cumulative difficulty up to the head.
    total_difficulty: U256,
    /// Which signer sealed each block, for the recent-signer rule.
    sealed_by: HashMap<u64, Address>,
}

impl InMemoryChain {
    /// Creates a chain holding only the genesis block of the given spec.
    pub fn new(spec: Arc<ChainSpec>, mut signers: Vec<Address>) -> Self {
        signers.sort_unstable();
        signers.dedup();

        let genesis = SealedBlock {
            header: spec.genesis.clone().seal(spec.genesis_hash()),
            body: Vec::new(),
            ommers: Vec::new(),
        };
        let total_difficulty = genesis.difficulty;

        let inner = ChainInner {
            blocks: HashMap::from([(genesis.hash(), Arc::new(genesis.clone()))]),
            canonical: vec![genesis.hash()],
            total_difficulty,
            sealed_by: HashMap::new(),
        };

        let (canon_tx, _) = broadcast::channel(256);
        Self { spec, signers, inner: RwLock::new(inner), canon_tx }
    }

    /// The canonical block at the given number.
    pub fn block_by_number(&self, number: u64) -> Option<Arc<SealedBlock>> {
        let inner = self.inner.read();
        let hash = inner.canonical.get(number as usize)?;
        inner.blocks.get(hash).cloned()
    }

    /// The current height of the chain.
    pub fn head_number(&self) -> u64 {
        (self.inner.read().canonical.len() - 1) as u64
    }
}

impl ChainReader for InMemoryChain {
    fn chain_spec(&self) -> &ChainSpec {
        &self.spec
    }

    fn latest_header(&self) -> SealedHeader {
        self.latest_block().header
    }

    fn latest_block(&self) -> SealedBlock {
        let inner = self.inner.read();
        let head = inner.canonical.last().expect("chain always has a genesis");
        inner.blocks[head].as_ref().clone()
    }

    fn total_difficulty(&self) -> U256 {
        self.inner.read().total_difficulty
    }

    fn header_by_number(&self, number: u64) -> Option<SealedHeader> {
        self.block_by_number(number).map(|block| block.header.clone())
    }

    fn header_by_hash(&self, hash: B256) -> Option<SealedHeader> {
        self.inner.read().blocks.get(&hash).map(|block| block.header.clone())
    }
}

impl BlockImport for InMemoryChain {
    fn insert_block(&self, block: SealedBlock) -> Result<(), BlockImportError> {
        let notification = {
            let mut inner = self.inner.write();

            let head_hash = *inner.canonical.last().expect("chain always has a genesis");
            if block.parent_hash != head_hash {
                return Err(BlockImportError::NonCanonicalParent {
                    number: block.number(),
                    parent_hash: block.parent_hash,
                })
            }
            let expected = inner.canonical.len() as u64;
            if block.number() != expected {
                return Err(BlockImportError::UnexpectedNumber(GotExpected {
                    got: block.number(),
                    expected,
                }))
            }

            // under Clique the sealer is recoverable from the extra-data;
            // otherwise credit the beneficiary
            let sealer = clique::recover_signer(&block.header).unwrap_or(block.beneficiary);

            let number = block.number();
            let hash = block.hash();
            let block = Arc::new(block);

            inner.total_difficulty += block.difficulty;
            inner.canonical.push(hash);
            inner.blocks.insert(hash, block.clone());
            inner.sealed_by.insert(number, sealer);

            CanonStateNotification { block, total_difficulty: inner.total_difficulty }
        };

        debug!(
            number = notification.block.number(),
            hash = %notification.block.hash(),
            "canonical chain advanced"
        );
        // nobody listening is fine
        let _ = self.canon_tx.send(notification);
        Ok(())
    }
}

impl CanonStateSubscriptions for InMemoryChain {
    fn subscribe_canon_state(&self) -> CanonStateNotifications {
        self.canon_tx.subscribe()
    }
}

impl CliqueReader for InMemoryChain {
    fn signer_in_turn(&self, signer: Address, number: u64) -> bool {
        if self.signers.is_empty() {
            return false
        }
        self.signers[number as usize % self.signers.len()] == signer
    }

    fn active_signers(&self) -> Vec<Address> {
        self.signers.clone()
    }

    fn recently_signed(&self, signer: Address, number: u64) -> bool {
        // a signer must wait `signers / 2 + 1` blocks between seals, i.e. it
        // may not have sealed any of the `limit - 1` blocks before `number`
        let limit = (self.signers.len() / 2 + 1) as u64;
        let window = limit.saturating_sub(1).min(number);
        let inner = self.inner.read();
        (number - window..number)
            .any(|sealed| inner.sealed_by.get(&sealed).copied() == Some(signer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_forks::{ForkCondition, Hardfork};
    use ember_primitives::{Block, Header};

    fn spec() -> Arc<ChainSpec> {
        Arc::new(
            ChainSpec::builder()
                .chain_id(1337)
                .genesis(Header { gas_limit: 8_000_000, ..Default::default() })
                .with_fork(Hardfork::Frontier, ForkCondition::Block(0))
                .build(),
        )
    }

    fn child_of(parent: &SealedHeader) -> SealedBlock {
        Block {
            header: Header {
                parent_hash: parent.hash(),
                number: parent.number + 1,
                difficulty: U256::from(1u64),
                gas_limit: parent.gas_limit,
                ..Default::default()
            },
            body: Vec::new(),
            ommers: Vec::new(),
        }
        .seal_slow()
    }

    #[test]
    fn genesis_is_the_initial_head() {
        let chain = InMemoryChain::new(spec(), Vec::new());
        assert_eq!(chain.head_number(), 0);
        assert_eq!(chain.latest_header().hash(), chain.genesis_hash());
        assert_eq!(chain.network_id(), 1337);
    }

    #[test]
    fn insert_advances_head_and_difficulty() {
        let chain = InMemoryChain::new(spec(), Vec::new());
        let genesis_td = chain.total_difficulty();

        let block = child_of(&chain.latest_header());
        let hash = block.hash();
        chain.insert_block(block).unwrap();

        assert_eq!(chain.head_number(), 1);
        assert_eq!(chain.latest_header().hash(), hash);
        assert_eq!(chain.total_difficulty(), genesis_td + U256::from(1u64));
    }

    #[test]
    fn rejects_non_extending_block() {
        let chain = InMemoryChain::new(spec(), Vec::new());
        let orphan = Block {
            header: Header { parent_hash: B256::repeat_byte(0xff), number: 1, ..Default::default() },
            body: Vec::new(),
            ommers: Vec::new(),
        }
        .seal_slow();

        assert!(matches!(
            chain.insert_block(orphan),
            Err(BlockImportError::NonCanonicalParent { .. })
        ));
    }

    #[test]
    fn notifies_subscribers_on_insert() {
        let chain = InMemoryChain::new(spec(), Vec::new());
        let mut notifications = chain.subscribe_canon_state();

        let block = child_of(&chain.latest_header());
        let hash = block.hash();
        chain.insert_block(block).unwrap();

        let notification = notifications.try_recv().unwrap();
        assert_eq!(notification.block.hash(), hash);
    }

    #[test]
    fn signer_rotation() {
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);
        let chain = InMemoryChain::new(spec(), vec![b, a]);

        // sorted set: a < b
        assert!(chain.signer_in_turn(a, 0));
        assert!(chain.signer_in_turn(b, 1));
        assert!(chain.signer_in_turn(a, 2));
        assert!(!chain.signer_in_turn(b, 2));
    }

    #[test]
    fn single_signer_is_never_recently_signed() {
        let a = Address::repeat_byte(0x01);
        let chain = InMemoryChain::new(spec(), vec![a]);

        let block = child_of(&chain.latest_header());
        chain.insert_block(block).unwrap();
        assert!(!chain.recently_signed(a, 2));
    }

    #[test]
    fn two_signers_must_alternate() {
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);
        let chain = InMemoryChain::new(spec(), vec![a, b]);

        let mut block = child_of(&chain.latest_header());
        block.header = {
            let mut header = block.header.clone().unseal();
            header.beneficiary = a;
            header.seal_slow()
        };
        chain.insert_block(block).unwrap();

        // a sealed block 1, so it must sit out block 2
        assert!(chain.recently_signed(a, 2));
        assert!(!chain.recently_signed(b, 2));
        // by block 3 the window has passed
        assert!(!chain.recently_signed(a, 3));
    }
}
