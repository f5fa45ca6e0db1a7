use alloy_primitives::{B256, U256};
use ember_forks::{ForkCondition, ForkFilter, ForkHash, ForkId, Hardfork};
use ember_primitives::{BaseFeeParams, Header};
use std::collections::BTreeMap;

/// Clique consensus parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliqueConfig {
    /// Number of seconds between blocks to enforce.
    pub period: u64,
    /// Epoch length after which votes reset and signers are checkpointed.
    pub epoch: u64,
}

impl Default for CliqueConfig {
    fn default() -> Self {
        Self { period: 15, epoch: 30_000 }
    }
}

/// The specification of a chain: its network id, genesis block, hardfork
/// schedule and consensus parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    /// The network id exchanged in the STATUS handshake.
    pub chain_id: u64,
    /// The genesis block header.
    pub genesis: Header,
    /// Memoized hash of the genesis header.
    genesis_hash: B256,
    /// The hardforks and the conditions under which they activate.
    pub hardforks: BTreeMap<Hardfork, ForkCondition>,
    /// Clique parameters, for proof-of-authority chains.
    pub clique: Option<CliqueConfig>,
    /// EIP-1559 base fee parameters.
    pub base_fee_params: BaseFeeParams,
}

impl ChainSpec {
    /// Returns a new builder.
    pub fn builder() -> ChainSpecBuilder {
        ChainSpecBuilder::default()
    }

    /// The hash of the genesis block.
    pub const fn genesis_hash(&self) -> B256 {
        self.genesis_hash
    }

    /// The activation condition of the given fork, [`ForkCondition::Never`]
    /// if the fork is not scheduled.
    pub fn fork(&self, fork: Hardfork) -> ForkCondition {
        self.hardforks.get(&fork).copied().unwrap_or(ForkCondition::Never)
    }

    /// The hardfork active at the given block number.
    ///
    /// Forks conditioned on total difficulty (the proof-of-stake transition)
    /// only activate when the caller supplies the parent's total difficulty.
    pub fn hardfork_at(&self, number: u64, td: Option<U256>) -> Hardfork {
        let mut active = Hardfork::Frontier;
        for (fork, condition) in &self.hardforks {
            let activated = match condition {
                ForkCondition::Block(_) => condition.active_at_block(number),
                ForkCondition::TotalDifficulty(_) => {
                    td.is_some_and(|td| condition.active_at_ttd(td))
                }
                ForkCondition::Never => false,
            };
            if activated {
                active = *fork;
            }
        }
        active
    }

    /// The block at which the first fork after the given one activates, if
    /// any fork is scheduled beyond it.
    pub fn next_hardfork_block(&self, fork: Hardfork) -> Option<u64> {
        let activation = self.fork(fork).as_block()?;
        self.fork_blocks().into_iter().find(|block| *block > activation)
    }

    /// All block-conditioned fork activation heights, ascending and
    /// deduplicated, genesis excluded.
    pub fn fork_blocks(&self) -> Vec<u64> {
        let mut blocks: Vec<u64> = self
            .hardforks
            .values()
            .filter_map(ForkCondition::as_block)
            .filter(|block| *block > 0)
            .collect();
        blocks.sort_unstable();
        blocks.dedup();
        blocks
    }

    /// The EIP-2124 fork id at the given head.
    pub fn fork_id(&self, head: u64) -> ForkId {
        self.fork_filter(head).current()
    }

    /// A [`ForkFilter`] validating remote fork ids against this chain at the
    /// given head.
    pub fn fork_filter(&self, head: u64) -> ForkFilter {
        ForkFilter::new(head, self.genesis_hash, self.fork_blocks())
    }

    /// The fork hash of the era containing `head`.
    pub fn fork_hash(&self, head: u64) -> ForkHash {
        self.fork_id(head).hash
    }

    /// The London activation block, if scheduled.
    pub fn london_block(&self) -> Option<u64> {
        self.fork(Hardfork::London).as_block()
    }

    /// Whether blocks at the given height carry an EIP-1559 base fee.
    pub fn is_london_active_at_block(&self, number: u64) -> bool {
        self.fork(Hardfork::London).active_at_block(number)
    }
}

/// Builder for a [`ChainSpec`].
#[derive(Debug, Default)]
pub struct ChainSpecBuilder {
    chain_id: u64,
    genesis: Header,
    hardforks: BTreeMap<Hardfork, ForkCondition>,
    clique: Option<CliqueConfig>,
    base_fee_params: Option<BaseFeeParams>,
}

impl ChainSpecBuilder {
    /// Sets the network id.
    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Sets the genesis header.
    pub fn genesis(mut self, genesis: Header) -> Self {
        self.genesis = genesis;
        self
    }

    /// Schedules a fork.
    pub fn with_fork(mut self, fork: Hardfork, condition: ForkCondition) -> Self {
        self.hardforks.insert(fork, condition);
        self
    }

    /// Enables Clique proof-of-authority with the given parameters.
    pub fn clique(mut self, config: CliqueConfig) -> Self {
        self.clique = Some(config);
        self
    }

    /// Overrides the EIP-1559 base fee parameters.
    pub fn base_fee_params(mut self, params: BaseFeeParams) -> Self {
        self.base_fee_params = Some(params);
        self
    }

    /// Builds the [`ChainSpec`], memoizing the genesis hash.
    pub fn build(self) -> ChainSpec {
        let genesis_hash = self.genesis.hash_slow();
        ChainSpec {
            chain_id: self.chain_id,
            genesis: self.genesis,
            genesis_hash,
            hardforks: self.hardforks,
            clique: self.clique,
            base_fee_params: self.base_fee_params.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn berlin_london_spec() -> ChainSpec {
        ChainSpec::builder()
            .chain_id(1337)
            .with_fork(Hardfork::Frontier, ForkCondition::Block(0))
            .with_fork(Hardfork::Berlin, ForkCondition::Block(2))
            .with_fork(Hardfork::London, ForkCondition::Block(3))
            .clique(CliqueConfig { period: 1, epoch: 30_000 })
            .build()
    }

    #[test]
    fn hardfork_resolution_by_block() {
        let spec = berlin_london_spec();
        assert_eq!(spec.hardfork_at(0, None), Hardfork::Frontier);
        assert_eq!(spec.hardfork_at(1, None), Hardfork::Frontier);
        assert_eq!(spec.hardfork_at(2, None), Hardfork::Berlin);
        assert_eq!(spec.hardfork_at(3, None), Hardfork::London);
        assert_eq!(spec.hardfork_at(100, None), Hardfork::London);
    }

    #[test]
    fn ttd_fork_needs_supplied_difficulty() {
        let spec = ChainSpec::builder()
            .with_fork(Hardfork::Frontier, ForkCondition::Block(0))
            .with_fork(Hardfork::London, ForkCondition::Block(0))
            .with_fork(Hardfork::Paris, ForkCondition::TotalDifficulty(U256::from(100u64)))
            .build();

        assert_eq!(spec.hardfork_at(10, None), Hardfork::London);
        assert_eq!(spec.hardfork_at(10, Some(U256::from(99u64))), Hardfork::London);
        assert_eq!(spec.hardfork_at(10, Some(U256::from(100u64))), Hardfork::Paris);
    }

    #[test]
    fn next_hardfork_block_walks_schedule() {
        let spec = berlin_london_spec();
        assert_eq!(spec.next_hardfork_block(Hardfork::Frontier), Some(2));
        assert_eq!(spec.next_hardfork_block(Hardfork::Berlin), Some(3));
        assert_eq!(spec.next_hardfork_block(Hardfork::London), None);
    }

    #[test]
    fn london_activation() {
        let spec = berlin_london_spec();
        assert_eq!(spec.london_block(), Some(3));
        assert!(!spec.is_london_active_at_block(2));
        assert!(spec.is_london_active_at_block(3));
    }
}
