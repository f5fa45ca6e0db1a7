//! End-to-end proof-of-authority block production: a miner, an in-memory
//! chain and the mock execution collaborator, driven through the full
//! assembly loop under virtual time.

use alloy_primitives::{Address, Bytes, TxKind, U256};
use ember_chain::{
    CanonStateSubscriptions, ChainReader, ChainSpec, CliqueConfig, InMemoryChain,
};
use ember_evm::mock::MockEvm;
use ember_forks::{ForkCondition, Hardfork};
use ember_miner::{CliqueSigner, Miner, MinerConfig};
use ember_primitives::{
    constants::{EIP1559_INITIAL_BASE_FEE, MIN_TRANSACTION_GAS},
    sign_message, Header, SealedBlock, Transaction, TransactionSigned, TxLegacy,
};
use ember_transaction_pool::TransactionPool;
use secp256k1::SecretKey;
use std::{sync::Arc, time::Duration};

fn poa_spec(hardforks: &[(Hardfork, u64)]) -> ChainSpec {
    let mut builder = ChainSpec::builder()
        .chain_id(1337)
        .genesis(Header { gas_limit: 8_000_000, ..Default::default() })
        .clique(CliqueConfig { period: 1, epoch: 30_000 });
    for (fork, block) in hardforks {
        builder = builder.with_fork(*fork, ForkCondition::Block(*block));
    }
    builder.build()
}

fn transfer(secret: &SecretKey, nonce: u64, gas_price: u128) -> TransactionSigned {
    let tx = Transaction::Legacy(TxLegacy {
        chain_id: Some(1337),
        nonce,
        gas_price,
        gas_limit: MIN_TRANSACTION_GAS,
        to: TxKind::Call(Address::repeat_byte(0x09)),
        value: U256::from(1u64),
        input: Bytes::new(),
    });
    let signature = sign_message(secret, tx.signature_hash());
    TransactionSigned::from_transaction_and_signature(tx, signature)
}

struct Network {
    chain: Arc<InMemoryChain>,
    pool: Arc<TransactionPool>,
    sender: SecretKey,
    signer: CliqueSigner,
    evm: MockEvm,
}

fn network(hardforks: &[(Hardfork, u64)]) -> Network {
    let signer = CliqueSigner::new(SecretKey::from_slice(&[0x21; 32]).unwrap());
    let chain = Arc::new(InMemoryChain::new(Arc::new(poa_spec(hardforks)), vec![signer.address]));

    let sender = SecretKey::from_slice(&[0x22; 32]).unwrap();
    let evm = MockEvm::new();
    evm.fund(ember_primitives::secret_key_to_address(&sender), U256::from(u64::MAX));

    Network { chain, pool: Arc::new(TransactionPool::new()), sender, signer, evm }
}

async fn await_blocks(
    canon: &mut ember_chain::CanonStateNotifications,
    count: usize,
) -> Vec<Arc<SealedBlock>> {
    let mut blocks = Vec::with_capacity(count);
    while blocks.len() < count {
        blocks.push(canon.recv().await.expect("chain must keep producing").block);
    }
    blocks
}

#[tokio::test(start_paused = true)]
async fn produces_block_with_pooled_transaction() {
    let Network { chain, pool, sender, signer, evm } = network(&[(Hardfork::Frontier, 0)]);

    let tx = transfer(&sender, 0, 1);
    pool.add_transaction(tx.clone()).unwrap();

    let config = MinerConfig::default()
        .with_period(Duration::from_secs(1))
        .with_signer(signer.clone());
    let (miner, handle) = Miner::new(config, chain.clone(), pool.clone(), evm);
    let mut canon = chain.subscribe_canon_state();
    let task = miner.spawn();

    let blocks = tokio::time::timeout(Duration::from_secs(2), await_blocks(&mut canon, 1))
        .await
        .expect("a block must be produced within two seconds");

    let block = &blocks[0];
    assert_eq!(block.number(), 1);
    assert_eq!(block.body, vec![tx]);
    let difficulty = block.difficulty;
    assert!(difficulty == U256::from(1u64) || difficulty == U256::from(2u64));
    // the single signer is always in turn
    assert_eq!(difficulty, U256::from(2u64));
    // the sealed signer is recoverable
    assert_eq!(ember_chain::clique::recover_signer(&block.header), Some(signer.address));
    // mined transactions left the pool
    assert!(pool.is_empty());

    handle.stop();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn london_transition_schedule() {
    // chainstart at 0, berlin at 2, london at 3
    let Network { chain, pool, sender: _, signer, evm } = network(&[
        (Hardfork::Frontier, 0),
        (Hardfork::Berlin, 2),
        (Hardfork::London, 3),
    ]);

    let config = MinerConfig::default()
        .with_period(Duration::from_secs(1))
        .with_signer(signer);
    let (miner, handle) = Miner::new(config, chain.clone(), pool, evm);
    let mut canon = chain.subscribe_canon_state();
    let task = miner.spawn();

    let blocks = tokio::time::timeout(Duration::from_secs(10), await_blocks(&mut canon, 4))
        .await
        .expect("four blocks must be produced");
    handle.stop();
    task.await.unwrap();

    let (block1, block2, block3, block4) = (&blocks[0], &blocks[1], &blocks[2], &blocks[3]);

    // pre-London blocks carry no base fee
    assert_eq!(block1.base_fee_per_gas, None);
    assert_eq!(block2.base_fee_per_gas, None);

    // the fork block starts at the initial base fee and doubles the limit
    assert_eq!(block3.number(), 3);
    assert_eq!(block3.base_fee_per_gas, Some(EIP1559_INITIAL_BASE_FEE));
    assert_eq!(block3.gas_limit, 2 * block2.gas_limit);

    // afterwards the parent's update rule applies
    let spec = chain.chain_spec();
    assert_eq!(
        block4.base_fee_per_gas,
        block3.next_block_base_fee(spec.base_fee_params)
    );
}

#[tokio::test(start_paused = true)]
async fn base_fee_excludes_underpriced_transactions() {
    let Network { chain, pool, sender, signer, evm } =
        network(&[(Hardfork::Frontier, 0), (Hardfork::London, 1)]);

    // gas price 1 wei cannot cover the initial base fee of block 1
    pool.add_transaction(transfer(&sender, 0, 1)).unwrap();
    // a properly priced transaction from the same sender cannot be included
    // either: its nonce chain starts at the underpriced one
    pool.add_transaction(transfer(&sender, 1, u128::from(EIP1559_INITIAL_BASE_FEE))).unwrap();

    let config = MinerConfig::default()
        .with_period(Duration::from_secs(1))
        .with_signer(signer);
    let (miner, handle) = Miner::new(config, chain.clone(), pool.clone(), evm);
    let mut canon = chain.subscribe_canon_state();
    let task = miner.spawn();

    let blocks = tokio::time::timeout(Duration::from_secs(2), await_blocks(&mut canon, 1))
        .await
        .expect("a block must be produced");
    handle.stop();
    task.await.unwrap();

    assert_eq!(blocks[0].body, vec![]);
    assert_eq!(pool.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_halts_production() {
    let Network { chain, pool, sender: _, signer, evm } = network(&[(Hardfork::Frontier, 0)]);

    let config = MinerConfig::default()
        .with_period(Duration::from_secs(1))
        .with_signer(signer);
    let (miner, handle) = Miner::new(config, chain.clone(), pool, evm);
    let mut canon = chain.subscribe_canon_state();
    let task = miner.spawn();

    let _ = tokio::time::timeout(Duration::from_secs(2), await_blocks(&mut canon, 1)).await;
    handle.stop();
    task.await.unwrap();

    let head_after_stop = chain.head_number();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(chain.head_number(), head_after_stop);
}
