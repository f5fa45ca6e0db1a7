use crate::{metrics::MinerMetrics, MinerConfig, OUT_OF_TURN_DELAY_PER_SIGNER};
use alloy_primitives::{Address, B256, U256};
use ember_chain::{
    BlockImport, CanonStateNotifications, CanonStateSubscriptions, ChainReader, CliqueReader,
};
use ember_evm::{BlockBuilder, BlockBuilderError, Evm, EvmState, HeaderAttributes};
use ember_primitives::{
    constants::{
        CLIQUE_DIFF_IN_TURN, CLIQUE_DIFF_NO_TURN, EIP1559_INITIAL_BASE_FEE, MIN_TRANSACTION_GAS,
    },
    SealedHeader,
};
use ember_transaction_pool::TransactionPool;
use rand::Rng;
use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::sync::{broadcast::error::TryRecvError, mpsc};
use tracing::{debug, info, trace, warn};

/// Commands the [`MinerHandle`] sends into the loop.
#[derive(Debug)]
enum MinerCommand {
    Stop,
}

/// Handle controlling a spawned [`Miner`].
#[derive(Debug, Clone)]
pub struct MinerHandle {
    to_miner: mpsc::UnboundedSender<MinerCommand>,
}

impl MinerHandle {
    /// Stops the assembly loop. An assembly in flight unwinds at its next
    /// interrupt check.
    pub fn stop(&self) {
        let _ = self.to_miner.send(MinerCommand::Stop);
    }
}

/// What one assembly round ended as.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AssemblyOutcome {
    /// A block was assembled and submitted.
    Built(B256),
    /// The canonical chain moved mid-assembly; nothing was submitted.
    Interrupted,
    /// The round was skipped before opening a builder.
    Skipped,
}

/// The block assembly loop.
///
/// Subscribes to canonical-state notifications and, every block period,
/// assembles the best pool transactions into a block on top of the current
/// head, observing Clique signer-turn rules. A chain update observed at a
/// transaction boundary aborts the round without submitting.
#[derive(Debug)]
pub struct Miner<C, E> {
    config: MinerConfig,
    chain: Arc<C>,
    pool: Arc<TransactionPool>,
    evm: E,
    commands: mpsc::UnboundedReceiver<MinerCommand>,
    /// Reentrancy guard: at most one assembly in flight.
    assembling: bool,
    metrics: MinerMetrics,
}

impl<C, E> Miner<C, E>
where
    C: ChainReader + BlockImport + CliqueReader + CanonStateSubscriptions + 'static,
    E: Evm + 'static,
{
    /// Creates the miner and its control handle.
    pub fn new(
        config: MinerConfig,
        chain: Arc<C>,
        pool: Arc<TransactionPool>,
        evm: E,
    ) -> (Self, MinerHandle) {
        let (to_miner, commands) = mpsc::unbounded_channel();
        let miner = Self {
            config,
            chain,
            pool,
            evm,
            commands,
            assembling: false,
            metrics: MinerMetrics::default(),
        };
        (miner, MinerHandle { to_miner })
    }

    /// Spawns the assembly loop onto the runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs the assembly loop until [`MinerHandle::stop`] is called or every
    /// handle is dropped.
    pub async fn run(mut self) {
        let mut canon = self.chain.subscribe_canon_state();
        info!(period = ?self.config.period, "miner started");

        loop {
            let delay = self.next_assembly_delay();
            trace!(?delay, "scheduling next assembly");

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(MinerCommand::Stop) | None => break,
                },
                notification = canon.recv() => {
                    // the head moved: fall through and reschedule against it
                    if let Ok(notification) = notification {
                        trace!(number = notification.block.number(), "head changed, rescheduling");
                    }
                }
                _ = tokio::time::sleep(delay) => {
                    self.assemble(&mut canon).await;
                }
            }
        }

        info!("miner stopped");
    }

    /// The time until the next block is due: `period` after the head's
    /// timestamp, plus a random wiggle when sealing out of turn.
    fn next_assembly_delay(&self) -> Duration {
        let parent = self.chain.latest_header();
        let target = parent.timestamp + self.config.period.as_secs();
        let mut delay = Duration::from_secs(target.saturating_sub(unix_now()));

        if let Some(signer) = &self.config.signer {
            if !self.chain.signer_in_turn(signer.address, parent.number + 1) {
                let signers = self.chain.active_signers().len().max(1) as u64;
                let wiggle = signers * OUT_OF_TURN_DELAY_PER_SIGNER.as_millis() as u64;
                delay += Duration::from_millis(rand::rng().random_range(0..wiggle));
            }
        }

        delay
    }

    /// One assembly round, reentrancy guarded.
    async fn assemble(&mut self, canon: &mut CanonStateNotifications) {
        if self.assembling {
            trace!("assembly already in flight");
            return
        }
        self.assembling = true;
        let outcome = self.try_assemble(canon).await;
        self.assembling = false;

        match outcome {
            Ok(AssemblyOutcome::Built(hash)) => {
                self.metrics.blocks_built.increment(1);
                debug!(%hash, "assembly round finished");
            }
            Ok(AssemblyOutcome::Interrupted) => {
                self.metrics.assemblies_interrupted.increment(1);
                debug!("assembly interrupted by chain update");
            }
            Ok(AssemblyOutcome::Skipped) => {
                self.metrics.assemblies_skipped.increment(1);
            }
            Err(err) => warn!(%err, "assembly round failed"),
        }
    }

    async fn try_assemble(
        &mut self,
        canon: &mut CanonStateNotifications,
    ) -> Result<AssemblyOutcome, ember_evm::EvmError> {
        // anything that arrived before this round started is stale head
        // news, not an interrupt
        while canon.try_recv().is_ok() {}

        let parent = self.chain.latest_header();
        let number = parent.number + 1;
        let signer = self.config.signer.clone();

        if let Some(signer) = &signer {
            if self.chain.recently_signed(signer.address, number) {
                debug!(number, "signed recently, must wait for others");
                return Ok(AssemblyOutcome::Skipped)
            }
        }

        let state = self.evm.fork(&parent)?;

        let attributes = self.header_attributes(&parent, signer.as_ref().map(|s| s.address));
        let base_fee = attributes.base_fee_per_gas;
        trace!(number, base_fee, "opening pending block");

        let mut best = self.pool.best_transactions(|address| state.nonce(address), base_fee);
        let mut builder =
            BlockBuilder::new(state, &parent, attributes, signer.map(|s| s.secret));

        while let Some(tx) = best.next() {
            // every transaction boundary is a suspension point, so a chain
            // update lands here deterministically
            tokio::task::yield_now().await;
            match canon.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => {
                    builder.discard();
                    return Ok(AssemblyOutcome::Interrupted)
                }
            }

            match builder.add_transaction(tx.transaction(), tx.sender()) {
                Ok(()) => {}
                Err(BlockBuilderError::GasLimitExceeded { available, .. }) => {
                    if available < MIN_TRANSACTION_GAS {
                        debug!(number, available, "pending block is full");
                        break
                    }
                    best.mark_invalid(tx.sender());
                }
                Err(err) => {
                    debug!(%err, hash = %tx.hash(), "skipping transaction");
                    best.mark_invalid(tx.sender());
                }
            }
        }

        let block = builder.build();
        let hash = block.hash();
        info!(
            number = block.number(),
            %hash,
            transactions = block.body.len(),
            gas_used = block.gas_used,
            "assembled block"
        );

        if let Err(err) = self.chain.insert_block(block.clone()) {
            // drop the block; the next canonical-state notification
            // reschedules assembly on the new head
            warn!(%err, number = block.number(), "failed to submit assembled block");
            return Ok(AssemblyOutcome::Skipped)
        }
        self.pool.on_mined_block(&block);

        Ok(AssemblyOutcome::Built(hash))
    }

    /// Fixes the header fields of the pending block: Clique turn difficulty
    /// and the EIP-1559 base fee schedule.
    fn header_attributes(
        &self,
        parent: &SealedHeader,
        signer: Option<Address>,
    ) -> HeaderAttributes {
        let spec = self.chain.chain_spec();
        let number = parent.number + 1;

        let difficulty = match signer {
            Some(address) if spec.clique.is_some() => {
                if self.chain.signer_in_turn(address, number) {
                    CLIQUE_DIFF_IN_TURN
                } else {
                    CLIQUE_DIFF_NO_TURN
                }
            }
            _ => U256::from(1u64),
        };

        let mut gas_limit = parent.gas_limit;
        let base_fee_per_gas = if spec.london_block() == Some(number) {
            // the fork block doubles the gas limit so the gas target stays
            // where the limit used to be
            gas_limit *= 2;
            Some(EIP1559_INITIAL_BASE_FEE)
        } else if spec.is_london_active_at_block(number) {
            parent.next_block_base_fee(spec.base_fee_params)
        } else {
            None
        };

        HeaderAttributes {
            number,
            difficulty,
            gas_limit,
            base_fee_per_gas,
            timestamp: unix_now().max(parent.timestamp + self.config.period.as_secs()),
            beneficiary: signer.unwrap_or_default(),
            extra_data: self.config.extra_data.clone(),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CliqueSigner;
    use alloy_primitives::{Bytes, TxKind};
    use ember_chain::{ChainSpec, CliqueConfig, InMemoryChain};
    use ember_evm::mock::MockEvm;
    use ember_forks::{ForkCondition, Hardfork};
    use ember_primitives::{
        sign_message, Block, Header, Transaction, TransactionSigned, TxLegacy,
    };
    use secp256k1::SecretKey;

    fn poa_spec() -> ChainSpec {
        ChainSpec::builder()
            .chain_id(1337)
            .genesis(Header { gas_limit: 8_000_000, ..Default::default() })
            .with_fork(Hardfork::Frontier, ForkCondition::Block(0))
            .clique(CliqueConfig { period: 1, epoch: 30_000 })
            .build()
    }

    fn transfer(secret: &SecretKey, nonce: u64) -> TransactionSigned {
        let tx = Transaction::Legacy(TxLegacy {
            chain_id: Some(1337),
            nonce,
            gas_price: 1,
            gas_limit: MIN_TRANSACTION_GAS,
            to: TxKind::Call(Address::repeat_byte(0x09)),
            value: U256::from(1u64),
            input: Bytes::new(),
        });
        let signature = sign_message(secret, tx.signature_hash());
        TransactionSigned::from_transaction_and_signature(tx, signature)
    }

    struct Setup {
        chain: Arc<InMemoryChain>,
        pool: Arc<TransactionPool>,
        evm: MockEvm,
        signer: CliqueSigner,
        sender: SecretKey,
    }

    fn setup() -> Setup {
        let signer = CliqueSigner::new(SecretKey::from_slice(&[0x41; 32]).unwrap());
        let chain =
            Arc::new(InMemoryChain::new(Arc::new(poa_spec()), vec![signer.address]));

        let sender = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let evm = MockEvm::new();
        evm.fund(
            ember_primitives::secret_key_to_address(&sender),
            U256::from(u64::MAX),
        );

        Setup { chain, pool: Arc::new(TransactionPool::new()), evm, signer, sender }
    }

    fn miner_config(signer: &CliqueSigner) -> MinerConfig {
        MinerConfig::default()
            .with_period(Duration::from_secs(1))
            .with_signer(signer.clone())
    }

    #[tokio::test]
    async fn assembling_guard_makes_reentry_a_noop() {
        let Setup { chain, pool, evm, signer, sender } = setup();
        pool.add_transaction(transfer(&sender, 0)).unwrap();

        let (mut miner, _handle) =
            Miner::new(miner_config(&signer), chain.clone(), pool.clone(), evm);
        let mut canon = chain.subscribe_canon_state();

        miner.assembling = true;
        miner.assemble(&mut canon).await;

        // the guarded call did nothing
        assert_eq!(chain.head_number(), 0);
        assert_eq!(pool.len(), 1);

        miner.assembling = false;
        miner.assemble(&mut canon).await;
        assert_eq!(chain.head_number(), 1);
    }

    #[tokio::test]
    async fn chain_update_interrupts_assembly() {
        let Setup { chain, pool, evm, signer, sender } = setup();
        for nonce in 0..500 {
            pool.add_transaction(transfer(&sender, nonce)).unwrap();
        }

        let (mut miner, _handle) =
            Miner::new(miner_config(&signer), chain.clone(), pool.clone(), evm);
        let mut canon = chain.subscribe_canon_state();

        // a competing block arrives from the network at the first
        // transaction boundary
        let external = Block {
            header: Header {
                parent_hash: chain.genesis_hash(),
                number: 1,
                difficulty: U256::from(1u64),
                gas_limit: 8_000_000,
                timestamp: 1,
                ..Default::default()
            },
            body: vec![],
            ommers: vec![],
        }
        .seal_slow();
        let external_hash = external.hash();

        let _ = tokio::join!(miner.assemble(&mut canon), async {
            chain.insert_block(external).unwrap();
        });

        // the interrupted round never submitted: the head is the network
        // block and the pool was not drained
        assert_eq!(chain.head_number(), 1);
        assert_eq!(chain.latest_header().hash(), external_hash);
        assert_eq!(pool.len(), 500);
    }
}
